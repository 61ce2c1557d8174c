//! Gateway module - authenticated access to remote resource APIs
//!
//! Every gateway operation asks its `Authenticator` for a credential covering
//! the operation's declared scopes, then makes one round trip per page or
//! item. Nothing here retries: sends and deletes are user-visible side
//! effects, so an ambiguous failure is reported rather than repeated.

mod export;
mod transport;
pub mod drive;
pub mod gmail;

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use crate::auth::{load_client_secrets, Authenticator, CredentialStore, OAuthFlow, ScopeSet};
use crate::config::Config;
use crate::Result;
use crate::error::Error;

pub use drive::DriveGateway;
pub use export::{export_target, plan_fetch, FetchPlan, EXPORT_TABLE};
pub use gmail::{MailGateway, MailMessage, OutgoingMail};
pub use transport::{build_client, error_for_status, HttpTransport};

/// Opaque pagination token, valid for exactly one follow-up call
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Empty strings mean "first page" and map to `None`
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.is_empty() {
            None
        } else {
            Some(Self(token.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Page size checked against the provider maximum; never clamped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSize(u32);

impl PageSize {
    pub fn new(size: i64, max: u32) -> Result<Self> {
        if size < 1 || size > max as i64 {
            return Err(Error::Validation(format!(
                "page_size must be between 1 and {}, got {}", max, size
            )));
        }
        Ok(Self(size as u32))
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

/// Parameters for one `list` call
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub page_size: PageSize,
    pub cursor: Option<Cursor>,
    pub filter: Option<String>,
}

impl ListQuery {
    pub fn first(page_size: PageSize) -> Self {
        Self { page_size, cursor: None, filter: None }
    }

    pub fn with_cursor(mut self, cursor: Option<Cursor>) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        let filter = filter.into();
        self.filter = if filter.trim().is_empty() { None } else { Some(filter) };
        self
    }
}

/// Something a list operation produced and a read operation can consume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: String,
    pub mime_type: String,
    pub name: String,
}

/// One page of results
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<Cursor>,
}

impl<T> Page<T> {
    /// Build a page from a provider response.
    ///
    /// A page shorter than the requested size is always the last one, even
    /// if the provider handed back a token.
    pub fn from_provider(items: Vec<T>, token: Option<String>, page_size: PageSize) -> Self {
        let next_cursor = if items.len() < page_size.get() as usize {
            None
        } else {
            token.as_deref().and_then(Cursor::parse)
        };
        Self { items, next_cursor }
    }
}

/// Result of following cursors up to an explicit bound
#[derive(Debug, Clone, PartialEq)]
pub struct Collected<T> {
    pub items: Vec<T>,
    /// True when the limit stopped collection before the last page
    pub truncated: bool,
}

/// Keyed by a stable identifier, used to drop repeats across pages
pub trait Identified {
    fn id(&self) -> &str;
}

impl Identified for ResourceRef {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Follow cursors from `query` until the pages run out or `limit` items are held
pub async fn collect_pages<T, F, Fut>(query: ListQuery, limit: usize, mut fetch: F) -> Result<Collected<T>>
where
    T: Identified,
    F: FnMut(ListQuery) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    if limit == 0 {
        return Err(Error::Validation("limit must be at least 1".to_string()));
    }

    let mut seen = std::collections::HashSet::new();
    let mut items = Vec::new();
    let mut next = query;
    let mut pages = 0usize;

    loop {
        let page = fetch(next.clone()).await?;
        pages += 1;

        for item in page.items {
            if seen.insert(item.id().to_string()) {
                items.push(item);
            }
        }

        if items.len() >= limit {
            let truncated = items.len() > limit || page.next_cursor.is_some();
            items.truncate(limit);
            tracing::debug!("Collected {} items over {} pages (limit reached)", items.len(), pages);
            return Ok(Collected { items, truncated });
        }

        match page.next_cursor {
            Some(cursor) => next = next.with_cursor(Some(cursor)),
            None => {
                tracing::debug!("Collected {} items over {} pages", items.len(), pages);
                return Ok(Collected { items, truncated: false });
            }
        }
    }
}

/// Payload returned by a read
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    /// Opaque bytes; base64 only when crossing the tool boundary
    Binary(Vec<u8>),
}

impl Content {
    /// Decode text types as UTF-8, keep everything else opaque
    pub fn from_bytes(bytes: Vec<u8>, mime_type: &str) -> Self {
        if is_text_mime(mime_type) {
            match String::from_utf8(bytes) {
                Ok(text) => Content::Text(text),
                Err(e) => {
                    tracing::debug!("{} payload is not valid UTF-8, returning bytes", mime_type);
                    Content::Binary(e.into_bytes())
                }
            }
        } else {
            Content::Binary(bytes)
        }
    }
}

pub fn is_text_mime(mime_type: &str) -> bool {
    let essence = mime_type.split(';').next().unwrap_or("").trim();
    essence.starts_with("text/") || essence == "application/json"
}

/// A read result: content plus the type it is actually in
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub mime_type: String,
    pub content: Content,
}

/// Reject identifiers that would escape their URL path segment
pub fn validate_id(kind: &str, id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::Validation(format!("{} must not be empty", kind)));
    }
    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(Error::Validation(format!("{} contains invalid characters: {}", kind, id)));
    }
    Ok(())
}

/// The OAuth-protected integrations, each with its own credential record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integration {
    Drive,
    Gmail,
}

impl Integration {
    pub fn name(&self) -> &'static str {
        match self {
            Integration::Drive => "drive",
            Integration::Gmail => "gmail",
        }
    }

    /// Credential file name inside the credentials directory
    pub fn credential_file(&self) -> &'static str {
        match self {
            Integration::Drive => ".gdrive-server-credentials.json",
            Integration::Gmail => ".gmail-server-credentials.json",
        }
    }

    /// Scopes requested when authorizing this integration
    pub fn scopes(&self) -> ScopeSet {
        match self {
            Integration::Drive => ScopeSet::new([drive::DRIVE_READONLY]),
            Integration::Gmail => ScopeSet::new([gmail::GMAIL_MODIFY]),
        }
    }

    pub fn credential_store(&self, config: &Config) -> CredentialStore {
        CredentialStore::new(config.credentials_dir.join(self.credential_file()))
    }

    /// Build the authenticator for this integration from config.
    ///
    /// Fails with a configuration error when the client secrets are missing.
    pub fn authenticator(&self, config: &Config) -> Result<Authenticator> {
        let secrets = load_client_secrets(&config.client_secrets_path())?;
        let flow = OAuthFlow::new(
            secrets,
            config.oauth.callback_port,
            std::time::Duration::from_secs(config.oauth.timeout_secs),
            config.http_timeout(),
        )?;
        Ok(Authenticator::new(self.credential_store(config), Arc::new(flow), self.scopes()))
    }
}

impl FromStr for Integration {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "drive" | "gdrive" => Ok(Integration::Drive),
            "gmail" | "mail" => Ok(Integration::Gmail),
            other => Err(Error::Validation(format!("Unknown integration: {} (expected drive or gmail)", other))),
        }
    }
}
