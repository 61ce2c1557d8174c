//! Gmail tools - profile, send, list, read and trash

use std::sync::Arc;
use async_trait::async_trait;
use serde_json::{json, Value};
use crate::config::MAX_LIST_ALL_LIMIT;
use crate::gateway::gmail::{mailbox_query, MAX_PAGE_SIZE};
use crate::gateway::{ListQuery, MailGateway, OutgoingMail, PageSize};
use crate::Result;
use super::{ParamKind, ParamSpec, Tool, ToolArgs};

const MAILBOX_KINDS: &[&str] = &["unread", "read", "starred", "important"];

/// Page size used while collecting a mailbox listing
const LIST_PAGE_SIZE: i64 = 100;

/// Hard ceiling on the `limit` argument of `get_emails`
const MAX_LIST_LIMIT: i64 = MAX_LIST_ALL_LIMIT as i64;

pub struct CurrentUserEmailTool {
    mail: Arc<MailGateway>,
}

impl CurrentUserEmailTool {
    pub fn new(mail: Arc<MailGateway>) -> Self {
        Self { mail }
    }
}

#[async_trait]
impl Tool for CurrentUserEmailTool {
    fn name(&self) -> &str { "get_current_user_email_id" }
    fn description(&self) -> &str { "Get the current user's email address" }

    fn parameters(&self) -> Vec<ParamSpec> {
        Vec::new()
    }

    async fn execute(&self, _args: ToolArgs) -> Result<Value> {
        let email = self.mail.profile().await?;
        Ok(json!({ "email_id": email }))
    }
}

pub struct SendEmailTool {
    mail: Arc<MailGateway>,
}

impl SendEmailTool {
    pub fn new(mail: Arc<MailGateway>) -> Self {
        Self { mail }
    }
}

#[async_trait]
impl Tool for SendEmailTool {
    fn name(&self) -> &str { "send_email" }
    fn description(&self) -> &str {
        "Create and send a plain-text email. The message is sent exactly once."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("sender_id", ParamKind::String, "Sender address; use get_current_user_email_id"),
            ParamSpec::required("recipient_id", ParamKind::String, "Recipient address"),
            ParamSpec::required("subject", ParamKind::String, "Subject line"),
            ParamSpec::required("message", ParamKind::String, "Plain-text body"),
        ]
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let mail = OutgoingMail {
            from: args.str("sender_id")?.to_string(),
            to: args.str("recipient_id")?.to_string(),
            subject: args.str("subject")?.to_string(),
            body: args.str("message")?.to_string(),
        };
        let id = self.mail.send(&mail).await?;
        Ok(json!({ "message_id": id }))
    }
}

pub struct GetEmailsTool {
    mail: Arc<MailGateway>,
    default_limit: i64,
}

impl GetEmailsTool {
    /// `default_limit` applies when the caller gives no `limit`; the config
    /// loader has already checked it lies within `1..=MAX_LIST_ALL_LIMIT`
    pub fn new(mail: Arc<MailGateway>, default_limit: usize) -> Self {
        Self { mail, default_limit: default_limit as i64 }
    }
}

#[async_trait]
impl Tool for GetEmailsTool {
    fn name(&self) -> &str { "get_emails" }
    fn description(&self) -> &str {
        "Fetch message ids from the primary inbox. Follows pages until the mailbox is exhausted or the limit is reached."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::optional("type", ParamKind::String, "Which messages to list", json!("unread"))
                .one_of(MAILBOX_KINDS),
            ParamSpec::optional("limit", ParamKind::Integer, "Maximum number of messages to return", json!(self.default_limit))
                .with_range(1, MAX_LIST_LIMIT),
        ]
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let kind = args.str("type")?;
        let limit = args.int("limit")? as usize;

        let query = ListQuery::first(PageSize::new(LIST_PAGE_SIZE, MAX_PAGE_SIZE)?)
            .with_filter(mailbox_query(kind));
        let collected = self.mail.list_all(query, limit).await?;

        let messages: Vec<Value> = collected.items.iter()
            .map(|m| json!({ "message_id": m.id, "thread_id": m.name }))
            .collect();
        Ok(json!({
            "messages": messages,
            "truncated": collected.truncated,
        }))
    }
}

pub struct ReadEmailTool {
    mail: Arc<MailGateway>,
}

impl ReadEmailTool {
    pub fn new(mail: Arc<MailGateway>) -> Self {
        Self { mail }
    }
}

#[async_trait]
impl Tool for ReadEmailTool {
    fn name(&self) -> &str { "read_email_content" }
    fn description(&self) -> &str {
        "Retrieve an email's subject, sender, recipients, date and plain-text content"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required("email_id", ParamKind::String, "Message id from get_emails")]
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let message = self.mail.read(args.str("email_id")?).await?;
        Ok(serde_json::to_value(message)?)
    }
}

pub struct DeleteEmailTool {
    mail: Arc<MailGateway>,
}

impl DeleteEmailTool {
    pub fn new(mail: Arc<MailGateway>) -> Self {
        Self { mail }
    }
}

#[async_trait]
impl Tool for DeleteEmailTool {
    fn name(&self) -> &str { "delete_email" }
    fn description(&self) -> &str { "Move an email to the trash" }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required("message_id", ParamKind::String, "Message id to trash")]
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let id = args.str("message_id")?;
        self.mail.delete(id).await?;
        Ok(json!({ "message": format!("Email {} moved to trash.", id) }))
    }
}

/// Register every mail tool against one gateway
pub fn register_all(registry: &mut super::ToolRegistry, mail: Arc<MailGateway>, list_limit: usize) {
    registry.register(CurrentUserEmailTool::new(mail.clone()));
    registry.register(SendEmailTool::new(mail.clone()));
    registry.register(GetEmailsTool::new(mail.clone(), list_limit));
    registry.register(ReadEmailTool::new(mail.clone()));
    registry.register(DeleteEmailTool::new(mail));
}
