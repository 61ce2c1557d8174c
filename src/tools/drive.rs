//! Drive tools - list and read files

use std::sync::Arc;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Value};
use crate::gateway::drive::{resource_uri, MAX_PAGE_SIZE};
use crate::gateway::{Content, Cursor, DriveGateway, ListQuery, PageSize};
use crate::Result;
use super::{ParamKind, ParamSpec, Tool, ToolArgs};

/// List files in Drive, one page at a time
pub struct ListDriveFilesTool {
    drive: Arc<DriveGateway>,
}

impl ListDriveFilesTool {
    pub fn new(drive: Arc<DriveGateway>) -> Self {
        Self { drive }
    }
}

#[async_trait]
impl Tool for ListDriveFilesTool {
    fn name(&self) -> &str { "list_drive_files" }
    fn description(&self) -> &str {
        "List files in Google Drive. Returns one page of files and a cursor for the next page, if any."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::optional("page_size", ParamKind::Integer, "Number of files to return per page", json!(10))
                .with_range(1, MAX_PAGE_SIZE as i64),
            ParamSpec::optional("cursor", ParamKind::String, "Page token from a previous call; empty for the first page", json!("")),
            ParamSpec::optional("query", ParamKind::String, "Only files whose name contains this text", json!("")),
        ]
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let page_size = PageSize::new(args.int("page_size")?, MAX_PAGE_SIZE)?;
        let query = ListQuery::first(page_size)
            .with_cursor(args.opt_str("cursor").and_then(Cursor::parse))
            .with_filter(args.opt_str("query").unwrap_or_default());

        let page = self.drive.list(&query).await?;
        let resources: Vec<Value> = page.items.iter()
            .map(|r| json!({
                "uri": resource_uri(&r.id),
                "mimeType": r.mime_type,
                "name": r.name,
            }))
            .collect();

        Ok(json!({
            "resources": resources,
            "nextCursor": page.next_cursor,
        }))
    }
}

/// Read one Drive file
pub struct ReadDriveFileTool {
    drive: Arc<DriveGateway>,
}

impl ReadDriveFileTool {
    pub fn new(drive: Arc<DriveGateway>) -> Self {
        Self { drive }
    }
}

#[async_trait]
impl Tool for ReadDriveFileTool {
    fn name(&self) -> &str { "read_drive_file" }
    fn description(&self) -> &str {
        "Read a file from Google Drive. Docs, Sheets, Slides and Drawings are exported to Markdown, CSV, plain text and PNG."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("file_id", ParamKind::String, "Drive file id, as listed by list_drive_files (without the gdrive:/// prefix)"),
        ]
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let file_id = args.str("file_id")?;
        let file_id = file_id.strip_prefix("gdrive:///").unwrap_or(file_id);

        let doc = self.drive.read(file_id).await?;
        Ok(match doc.content {
            Content::Text(text) => json!({
                "mimeType": doc.mime_type,
                "encoding": "utf-8",
                "content": text,
            }),
            Content::Binary(bytes) => json!({
                "mimeType": doc.mime_type,
                "encoding": "base64",
                "content": STANDARD.encode(bytes),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use httpmock::prelude::*;
    use crate::auth::testing::authenticated;
    use crate::auth::ScopeSet;
    use crate::gateway::drive::DRIVE_READONLY;
    use crate::gateway::HttpTransport;
    use crate::tools::ToolRegistry;
    use super::*;

    fn registry(server: &MockServer, dir: &std::path::Path) -> ToolRegistry {
        let auth = Arc::new(authenticated(dir, ScopeSet::new([DRIVE_READONLY])));
        let http = HttpTransport::new(server.base_url(), Duration::from_secs(5)).unwrap();
        let drive = Arc::new(DriveGateway::new(auth, http));
        let mut registry = ToolRegistry::new();
        registry.register(ListDriveFilesTool::new(drive.clone()));
        registry.register(ReadDriveFileTool::new(drive));
        registry
    }

    #[tokio::test]
    async fn test_list_renders_resources() {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir().unwrap();
        server.mock_async(|when, then| {
            when.method(GET).path("/files").query_param("pageSize", "2").query_param("pageToken", "tok");
            then.status(200).json_body(json!({
                "files": [
                    {"id": "a", "name": "A", "mimeType": "text/plain"},
                    {"id": "b", "name": "B", "mimeType": "application/pdf"}
                ],
                "nextPageToken": "tok2"
            }));
        }).await;

        let outcome = registry(&server, dir.path())
            .invoke("list_drive_files", json!({"page_size": 2, "cursor": "tok"}))
            .await
            .to_json();

        assert_eq!(outcome["status"], "success");
        assert_eq!(outcome["resources"][0], json!({"uri": "gdrive:///a", "mimeType": "text/plain", "name": "A"}));
        assert_eq!(outcome["nextCursor"], "tok2");
    }

    #[tokio::test]
    async fn test_list_rejects_oversized_page_before_network() {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir().unwrap();
        let any = server.mock_async(|_, then| { then.status(200); }).await;

        let outcome = registry(&server, dir.path())
            .invoke("list_drive_files", json!({"page_size": 5000}))
            .await
            .to_json();

        assert_eq!(outcome["error_kind"], "validation_error");
        any.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_read_binary_is_base64() {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir().unwrap();
        server.mock_async(|when, then| {
            when.method(GET).path("/files/img").query_param("fields", "id, name, mimeType");
            then.status(200).json_body(json!({"id": "img", "name": "i.png", "mimeType": "image/png"}));
        }).await;
        server.mock_async(|when, then| {
            when.method(GET).path("/files/img").query_param("alt", "media");
            then.status(200).body(vec![0x89u8, b'P', b'N', b'G']);
        }).await;

        let outcome = registry(&server, dir.path())
            .invoke("read_drive_file", json!({"file_id": "gdrive:///img"}))
            .await
            .to_json();

        assert_eq!(outcome["encoding"], "base64");
        assert_eq!(outcome["content"], STANDARD.encode([0x89u8, b'P', b'N', b'G']));
    }

    #[tokio::test]
    async fn test_read_missing_file_is_structured_error() {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir().unwrap();
        server.mock_async(|when, then| {
            when.path("/files/nope");
            then.status(404).json_body(json!({"error": {"message": "File not found: nope."}}));
        }).await;

        let outcome = registry(&server, dir.path())
            .invoke("read_drive_file", json!({"file_id": "nope"}))
            .await
            .to_json();

        assert_eq!(outcome["status"], "error");
        assert_eq!(outcome["error_kind"], "not_found");
    }
}
