//! Gmail gateway - list, read, send and trash messages

use std::sync::Arc;
use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::auth::{Authenticator, ScopeSet};
use crate::Result;
use crate::error::Error;
use super::{collect_pages, validate_id, Collected, HttpTransport, ListQuery, Page, ResourceRef};

pub const GMAIL_MODIFY: &str = "https://www.googleapis.com/auth/gmail.modify";
pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// Largest `maxResults` the messages endpoint accepts
pub const MAX_PAGE_SIZE: u32 = 500;

const MESSAGE_MIME: &str = "message/rfc822";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageStub>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageStub {
    id: String,
    #[serde(default)]
    thread_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Profile {
    email_address: String,
}

#[derive(Debug, Deserialize)]
struct FullMessage {
    id: String,
    #[serde(default)]
    payload: Option<MessagePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagePart {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    headers: Vec<Header>,
    #[serde(default)]
    body: Option<PartBody>,
    #[serde(default)]
    parts: Vec<MessagePart>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct PartBody {
    #[serde(default)]
    data: Option<String>,
}

#[derive(Debug, Serialize)]
struct RawMessage {
    raw: String,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

/// A message as read back from the mailbox
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MailMessage {
    pub id: String,
    pub subject: String,
    pub from: String,
    pub to: String,
    pub date: String,
    /// First `text/plain` body, if the message has one
    pub content: Option<String>,
}

/// A plain-text message to send
#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingMail {
    /// Render as an RFC 5322 message; header values may not contain line breaks
    pub fn to_rfc5322(&self) -> Result<String> {
        for (name, value) in [("From", &self.from), ("To", &self.to), ("Subject", &self.subject)] {
            if value.contains('\r') || value.contains('\n') {
                return Err(Error::Validation(format!("{} header must be a single line", name)));
            }
        }
        if self.to.trim().is_empty() {
            return Err(Error::Validation("recipient must not be empty".to_string()));
        }

        Ok(format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\nMIME-Version: 1.0\r\nContent-Type: text/plain; charset=\"utf-8\"\r\nContent-Transfer-Encoding: 8bit\r\n\r\n{}",
            self.from,
            self.to,
            encode_header(&self.subject),
            self.body
        ))
    }
}

/// RFC 2047 encoded-word for non-ASCII header text
fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?utf-8?b?{}?=", STANDARD.encode(value.as_bytes()))
    }
}

/// Gmail body data is base64url, with or without padding
fn decode_body(data: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(data.trim_end_matches('=')).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

impl MessagePart {
    fn header(&self, name: &str) -> String {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.clone())
            .unwrap_or_default()
    }

    fn body_text(&self) -> Option<String> {
        self.body.as_ref()?.data.as_deref().and_then(decode_body)
    }

    /// Depth-first search for the first text/plain part
    fn plain_text(&self) -> Option<String> {
        if self.mime_type == "text/plain" {
            if let Some(text) = self.body_text() {
                return Some(text);
            }
        }
        self.parts.iter().find_map(|p| p.plain_text())
    }

    fn content(&self) -> Option<String> {
        if self.parts.is_empty() {
            self.body_text()
        } else {
            self.plain_text()
        }
    }
}

/// The inbox query used by the mail tools
pub fn mailbox_query(kind: &str) -> String {
    format!("in:inbox is:{} category:primary", kind)
}

/// Mailbox access for the authenticated user
pub struct MailGateway {
    auth: Arc<Authenticator>,
    http: HttpTransport,
}

impl MailGateway {
    pub fn new(auth: Arc<Authenticator>, http: HttpTransport) -> Self {
        Self { auth, http }
    }

    fn scopes() -> ScopeSet {
        ScopeSet::new([GMAIL_MODIFY])
    }

    /// Email address of the authenticated account
    pub async fn profile(&self) -> Result<String> {
        let credential = self.auth.ensure_credential(&Self::scopes()).await?;
        let profile: Profile = self.auth
            .screen(&credential, self.http.get_json(&credential, "profile", &[]).await)
            .await?;
        Ok(profile.email_address)
    }

    /// One page of message references matching the filter
    pub async fn list(&self, query: &ListQuery) -> Result<Page<ResourceRef>> {
        let credential = self.auth.ensure_credential(&Self::scopes()).await?;

        let mut params = vec![("maxResults", query.page_size.get().to_string())];
        if let Some(filter) = &query.filter {
            params.push(("q", filter.clone()));
        }
        if let Some(cursor) = &query.cursor {
            params.push(("pageToken", cursor.as_str().to_string()));
        }

        let list: MessageList = self.auth
            .screen(&credential, self.http.get_json(&credential, "messages", &params).await)
            .await?;
        let items: Vec<ResourceRef> = list.messages
            .into_iter()
            .map(|m| ResourceRef {
                id: m.id,
                mime_type: MESSAGE_MIME.to_string(),
                name: m.thread_id,
            })
            .collect();
        tracing::debug!("Gmail list returned {} messages", items.len());

        Ok(Page::from_provider(items, list.next_page_token, query.page_size))
    }

    pub async fn list_all(&self, query: ListQuery, limit: usize) -> Result<Collected<ResourceRef>> {
        collect_pages(query, limit, |q| async move { self.list(&q).await }).await
    }

    pub async fn read(&self, message_id: &str) -> Result<MailMessage> {
        validate_id("email_id", message_id)?;
        let credential = self.auth.ensure_credential(&Self::scopes()).await?;

        let fetched = self.http
            .get_json(&credential, &format!("messages/{}", message_id), &[("format", "full".to_string())])
            .await;
        let message: FullMessage = self.auth.screen(&credential, fetched).await?;
        let payload = message.payload.unwrap_or_default();

        Ok(MailMessage {
            id: message.id,
            subject: payload.header("Subject"),
            from: payload.header("From"),
            to: payload.header("To"),
            date: payload.header("Date"),
            content: payload.content(),
        })
    }

    /// Send once and return the provider's message id. Never retried.
    pub async fn send(&self, mail: &OutgoingMail) -> Result<String> {
        let raw = URL_SAFE.encode(mail.to_rfc5322()?.as_bytes());
        let credential = self.auth.ensure_credential(&Self::scopes()).await?;

        let posted = self.http
            .post_json(&credential, "messages/send", &RawMessage { raw })
            .await;
        let sent: SentMessage = self.auth.screen(&credential, posted).await?;
        tracing::info!("Sent message {}", sent.id);
        Ok(sent.id)
    }

    /// Move a message to the trash
    pub async fn delete(&self, message_id: &str) -> Result<()> {
        validate_id("message_id", message_id)?;
        let credential = self.auth.ensure_credential(&Self::scopes()).await?;

        let trashed = self.http
            .post_empty(&credential, &format!("messages/{}/trash", message_id))
            .await;
        let _: Value = self.auth.screen(&credential, trashed).await?;
        tracing::info!("Trashed message {}", message_id);
        Ok(())
    }
}
