//! Drive gateway - list and read files

use std::sync::Arc;
use serde::Deserialize;
use crate::auth::{Authenticator, ScopeSet};
use crate::Result;
use super::{
    collect_pages, plan_fetch, validate_id, Collected, Content, Document, FetchPlan, HttpTransport,
    ListQuery, Page, ResourceRef,
};

pub const DRIVE_READONLY: &str = "https://www.googleapis.com/auth/drive.readonly";
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Largest page the Drive API accepts
pub const MAX_PAGE_SIZE: u32 = 1000;

const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType)";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<FileMeta>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileMeta {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mime_type: String,
}

impl From<FileMeta> for ResourceRef {
    fn from(f: FileMeta) -> Self {
        Self { id: f.id, mime_type: f.mime_type, name: f.name }
    }
}

/// URI form of a Drive file id, as shown to the model
pub fn resource_uri(id: &str) -> String {
    format!("gdrive:///{}", id)
}

/// Build the Drive `q` expression for a name filter
fn search_expression(filter: Option<&str>) -> String {
    match filter {
        Some(name) => format!(
            "name contains '{}' and trashed = false",
            name.replace('\\', "\\\\").replace('\'', "\\'")
        ),
        None => "trashed = false".to_string(),
    }
}

/// Read-only access to a user's Drive
pub struct DriveGateway {
    auth: Arc<Authenticator>,
    http: HttpTransport,
}

impl DriveGateway {
    pub fn new(auth: Arc<Authenticator>, http: HttpTransport) -> Self {
        Self { auth, http }
    }

    fn read_scopes() -> ScopeSet {
        ScopeSet::new([DRIVE_READONLY])
    }

    /// One page of non-trashed files, optionally filtered by name
    pub async fn list(&self, query: &ListQuery) -> Result<Page<ResourceRef>> {
        let credential = self.auth.ensure_credential(&Self::read_scopes()).await?;

        let mut params = vec![
            ("pageSize", query.page_size.get().to_string()),
            ("fields", LIST_FIELDS.to_string()),
            ("q", search_expression(query.filter.as_deref())),
        ];
        if let Some(cursor) = &query.cursor {
            params.push(("pageToken", cursor.as_str().to_string()));
        }

        let list: FileList = self.auth
            .screen(&credential, self.http.get_json(&credential, "files", &params).await)
            .await?;
        let items: Vec<ResourceRef> = list.files.into_iter().map(ResourceRef::from).collect();
        tracing::debug!("Drive list returned {} files", items.len());

        Ok(Page::from_provider(items, list.next_page_token, query.page_size))
    }

    /// Every page from `query` onward, capped at `limit` files
    pub async fn list_all(&self, query: ListQuery, limit: usize) -> Result<Collected<ResourceRef>> {
        collect_pages(query, limit, |q| async move { self.list(&q).await }).await
    }

    /// Read a file, exporting provider-native documents to a portable type
    pub async fn read(&self, file_id: &str) -> Result<Document> {
        validate_id("file_id", file_id)?;
        let credential = self.auth.ensure_credential(&Self::read_scopes()).await?;

        let path = format!("files/{}", file_id);
        let meta: FileMeta = self.auth
            .screen(&credential, self.http.get_json(&credential, &path, &[("fields", "id, name, mimeType".to_string())]).await)
            .await?;

        match plan_fetch(&meta.mime_type) {
            FetchPlan::Export(target) => {
                tracing::debug!("Exporting {} ({}) as {}", file_id, meta.mime_type, target);
                let export = self.http
                    .get_bytes(&credential, &format!("{}/export", path), &[("mimeType", target.to_string())])
                    .await;
                let (bytes, _) = self.auth.screen(&credential, export).await?;
                Ok(Document {
                    mime_type: target.to_string(),
                    content: Content::from_bytes(bytes, target),
                })
            }
            FetchPlan::Media => {
                let media = self.http
                    .get_bytes(&credential, &path, &[("alt", "media".to_string())])
                    .await;
                let (bytes, _) = self.auth.screen(&credential, media).await?;
                Ok(Document {
                    content: Content::from_bytes(bytes, &meta.mime_type),
                    mime_type: meta.mime_type,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use httpmock::prelude::*;
    use serde_json::json;
    use crate::auth::testing::authenticated;
    use crate::error::Error;
    use crate::gateway::{Cursor, PageSize, EXPORT_TABLE};
    use super::*;

    fn gateway(server: &MockServer, dir: &std::path::Path) -> DriveGateway {
        let auth = Arc::new(authenticated(dir, ScopeSet::new([DRIVE_READONLY])));
        let http = HttpTransport::new(server.base_url(), Duration::from_secs(5)).unwrap();
        DriveGateway::new(auth, http)
    }

    fn files(range: std::ops::Range<usize>) -> serde_json::Value {
        json!(range.map(|i| json!({"id": format!("f{}", i), "name": format!("file {}", i), "mimeType": "text/plain"})).collect::<Vec<_>>())
    }

    #[test]
    fn test_search_expression() {
        assert_eq!(search_expression(None), "trashed = false");
        assert_eq!(search_expression(Some("report")), "name contains 'report' and trashed = false");
        assert_eq!(search_expression(Some("bob's")), "name contains 'bob\\'s' and trashed = false");
    }

    #[tokio::test]
    async fn test_list_pages_through_25_files() {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir().unwrap();

        let first = server.mock_async(|when, then| {
            when.method(GET).path("/files")
                .query_param("pageSize", "10")
                .query_param("q", "trashed = false")
                .header("authorization", "Bearer token")
                .matches(|req| !req.query_params.as_ref().map_or(false, |q| q.iter().any(|(k, _)| k == "pageToken")));
            then.status(200).json_body(json!({"files": files(0..10), "nextPageToken": "p2"}));
        }).await;
        let second = server.mock_async(|when, then| {
            when.method(GET).path("/files").query_param("pageToken", "p2");
            then.status(200).json_body(json!({"files": files(10..20), "nextPageToken": "p3"}));
        }).await;
        let third = server.mock_async(|when, then| {
            when.method(GET).path("/files").query_param("pageToken", "p3");
            then.status(200).json_body(json!({"files": files(20..25)}));
        }).await;

        let drive = gateway(&server, dir.path());
        let query = ListQuery::first(PageSize::new(10, MAX_PAGE_SIZE).unwrap());

        let p1 = drive.list(&query).await.unwrap();
        assert_eq!(p1.items.len(), 10);
        assert_eq!(p1.next_cursor, Cursor::parse("p2"));

        let p2 = drive.list(&query.clone().with_cursor(p1.next_cursor.clone())).await.unwrap();
        assert_eq!(p2.items.len(), 10);

        let p3 = drive.list(&query.clone().with_cursor(p2.next_cursor.clone())).await.unwrap();
        assert_eq!(p3.items.len(), 5);
        assert!(p3.next_cursor.is_none());

        first.assert_async().await;
        second.assert_async().await;
        third.assert_async().await;

        let all = drive.list_all(query, 100).await.unwrap();
        assert_eq!(all.items.len(), 25);
        assert!(!all.truncated);
    }

    #[tokio::test]
    async fn test_revoked_token_is_replaced_on_next_call() {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir().unwrap();
        let revoked = server.mock_async(|when, then| {
            when.method(GET).path("/files").header("authorization", "Bearer token");
            then.status(401).json_body(json!({"error": {"code": 401, "message": "Invalid Credentials"}}));
        }).await;
        let renewed = server.mock_async(|when, then| {
            when.method(GET).path("/files").header("authorization", "Bearer authorized-0");
            then.status(200).json_body(json!({"files": files(0..2)}));
        }).await;

        let drive = gateway(&server, dir.path());
        let query = ListQuery::first(PageSize::new(10, MAX_PAGE_SIZE).unwrap());

        let err = drive.list(&query).await.unwrap_err();
        assert!(matches!(err, Error::CredentialRejected(_)));

        let page = drive.list(&query).await.unwrap();
        assert_eq!(page.items.len(), 2);
        revoked.assert_hits_async(1).await;
        renewed.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_list_with_filter() {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir().unwrap();
        let m = server.mock_async(|when, then| {
            when.method(GET).path("/files").query_param("q", "name contains 'budget' and trashed = false");
            then.status(200).json_body(json!({"files": files(0..1), "nextPageToken": "ignored"}));
        }).await;

        let drive = gateway(&server, dir.path());
        let query = ListQuery::first(PageSize::new(10, MAX_PAGE_SIZE).unwrap()).with_filter("budget");
        let page = drive.list(&query).await.unwrap();

        m.assert_async().await;
        assert_eq!(page.items[0].id, "f0");
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_read_exports_every_native_type() {
        for (native, target) in EXPORT_TABLE {
            let server = MockServer::start_async().await;
            let dir = tempfile::tempdir().unwrap();
            server.mock_async(|when, then| {
                when.method(GET).path("/files/doc1").query_param("fields", "id, name, mimeType");
                then.status(200).json_body(json!({"id": "doc1", "name": "Doc", "mimeType": native}));
            }).await;
            let export = server.mock_async(|when, then| {
                when.method(GET).path("/files/doc1/export").query_param("mimeType", *target);
                then.status(200).body("exported");
            }).await;
            let media = server.mock_async(|when, then| {
                when.method(GET).path("/files/doc1").query_param("alt", "media");
                then.status(200).body("raw");
            }).await;

            let doc = gateway(&server, dir.path()).read("doc1").await.unwrap();

            export.assert_hits_async(1).await;
            media.assert_hits_async(0).await;
            assert_eq!(doc.mime_type, *target);
            if target.starts_with("text/") {
                assert_eq!(doc.content, Content::Text("exported".to_string()));
            } else {
                assert_eq!(doc.content, Content::Binary(b"exported".to_vec()));
            }
        }
    }

    #[tokio::test]
    async fn test_read_fetches_media_for_regular_files() {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir().unwrap();
        server.mock_async(|when, then| {
            when.method(GET).path("/files/pdf1").query_param("fields", "id, name, mimeType");
            then.status(200).json_body(json!({"id": "pdf1", "name": "a.pdf", "mimeType": "application/pdf"}));
        }).await;
        let media = server.mock_async(|when, then| {
            when.method(GET).path("/files/pdf1").query_param("alt", "media");
            then.status(200).body(vec![0x25u8, 0x50, 0x44, 0x46, 0xff]);
        }).await;

        let doc = gateway(&server, dir.path()).read("pdf1").await.unwrap();

        media.assert_hits_async(1).await;
        assert_eq!(doc.mime_type, "application/pdf");
        assert_eq!(doc.content, Content::Binary(vec![0x25, 0x50, 0x44, 0x46, 0xff]));
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir().unwrap();
        server.mock_async(|when, then| {
            when.method(GET).path("/files/gone");
            then.status(404).json_body(json!({"error": {"code": 404, "message": "File not found: gone."}}));
        }).await;

        let err = gateway(&server, dir.path()).read("gone").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_read_rejects_bad_id_without_network() {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir().unwrap();
        let any = server.mock_async(|_, then| {
            then.status(200);
        }).await;

        let err = gateway(&server, dir.path()).read("../secrets").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        any.assert_hits_async(0).await;
    }
}
