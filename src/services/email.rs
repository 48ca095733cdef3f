use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::client::pagination::drain;
use crate::client::HttpGateway;
use crate::error::GraphError;
use crate::query::filters::{FilterCriteria, ResultLimit};
use crate::services::folders::MailboxFolders;
use crate::services::require;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyType {
    #[default]
    Text,
    #[serde(rename = "HTML")]
    Html,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingMail {
    pub subject: String,
    pub body: String,
    pub body_type: BodyType,
    pub to: Vec<String>,
    pub cc: Vec<String>,
}

impl OutgoingMail {
    fn to_payload(&self) -> Value {
        json!({
            "message": {
                "subject": self.subject,
                "body": { "contentType": self.body_type, "content": self.body },
                "toRecipients": recipients(&self.to),
                "ccRecipients": recipients(&self.cc),
            },
            "saveToSentItems": true
        })
    }
}

fn recipients(addresses: &[String]) -> Vec<Value> {
    addresses
        .iter()
        .map(|address| json!({ "emailAddress": { "address": address } }))
        .collect()
}

/// Move destination, either by display name or by folder id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderRef {
    Name(String),
    Id(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentContent {
    pub id: String,
    pub name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct FileAttachment {
    id: String,
    name: Option<String>,
    #[serde(rename = "contentType")]
    content_type: Option<String>,
    #[serde(rename = "contentBytes")]
    content_bytes: Option<String>,
}

pub struct EmailClient<'a> {
    gateway: &'a HttpGateway,
}

impl<'a> EmailClient<'a> {
    pub fn new(gateway: &'a HttpGateway) -> Self {
        Self { gateway }
    }

    pub async fn send_mail(&self, sender: &str, mail: &OutgoingMail) -> Result<(), GraphError> {
        let sender = require("sender", sender)?;
        if mail.to.iter().all(|address| address.trim().is_empty()) {
            return Err(GraphError::validation("to", "at least one recipient is required"));
        }

        let url = self.gateway.endpoint(&["users", sender, "sendMail"])?;
        let response = self.gateway.post(url.as_str(), &mail.to_payload()).await?;
        if !response.is_success() {
            return Err(response.error("error sending email"));
        }

        info!(%sender, recipients = mail.to.len(), "email sent");
        Ok(())
    }

    /// Messages in the mailbox, optionally inside the named folder. A
    /// numeric limit issues one request; [`ResultLimit::All`] drains every
    /// page.
    pub async fn list_messages(
        &self,
        mailbox: &str,
        folder: Option<&str>,
        criteria: &FilterCriteria,
    ) -> Result<Vec<Value>, GraphError> {
        let mailbox = require("mailbox", mailbox)?;
        let query = criteria.query_pairs()?;

        let folder_id = match folder.filter(|name| !name.trim().is_empty()) {
            Some(name) => Some(
                MailboxFolders::new(self.gateway)
                    .folder_id(mailbox, name)
                    .await?
                    .ok_or_else(|| GraphError::NotFound(format!("folder '{name}' in {mailbox}")))?,
            ),
            None => None,
        };

        let mut segments = vec!["users", mailbox];
        if let Some(folder_id) = folder_id.as_deref() {
            segments.extend(["mailFolders", folder_id]);
        }
        segments.push("messages");
        let url = self.gateway.endpoint_with_query(&segments, &query)?;

        if criteria.limit == Some(ResultLimit::All) {
            drain(self.gateway, &url).await
        } else {
            self.gateway.get_collection(&url).await
        }
    }

    pub async fn get_message(&self, mailbox: &str, message_id: &str) -> Result<Value, GraphError> {
        let mailbox = require("mailbox", mailbox)?;
        let message_id = require("message id", message_id)?;
        let url = self
            .gateway
            .endpoint(&["users", mailbox, "messages", message_id])?;

        let message = self.gateway.get_json_response(url.as_str(), false).await?;
        if message.is_null() {
            return Err(GraphError::NotFound(format!("message {message_id}")));
        }
        Ok(message)
    }

    pub async fn list_attachments(
        &self,
        mailbox: &str,
        message_id: &str,
    ) -> Result<Vec<Value>, GraphError> {
        let mailbox = require("mailbox", mailbox)?;
        let message_id = require("message id", message_id)?;
        let url = self
            .gateway
            .endpoint(&["users", mailbox, "messages", message_id, "attachments"])?;
        self.gateway.get_collection(url.as_str()).await
    }

    /// Fetches a file attachment and decodes its `contentBytes`.
    pub async fn download_attachment(
        &self,
        mailbox: &str,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<AttachmentContent, GraphError> {
        let mailbox = require("mailbox", mailbox)?;
        let message_id = require("message id", message_id)?;
        let attachment_id = require("attachment id", attachment_id)?;
        let url = self.gateway.endpoint(&[
            "users",
            mailbox,
            "messages",
            message_id,
            "attachments",
            attachment_id,
        ])?;

        let raw = self.gateway.get_json_response(url.as_str(), false).await?;
        if raw.is_null() {
            return Err(GraphError::NotFound(format!("attachment {attachment_id}")));
        }

        let attachment: FileAttachment = serde_json::from_value(raw)?;
        let encoded = attachment.content_bytes.ok_or_else(|| {
            GraphError::validation("attachment", "has no contentBytes (not a file attachment)")
        })?;
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|error| GraphError::validation("contentBytes", error.to_string()))?;

        Ok(AttachmentContent {
            id: attachment.id,
            name: attachment.name,
            content_type: attachment.content_type,
            bytes,
        })
    }

    /// Moves a message and returns the moved copy. A destination given by
    /// name must exist in the mailbox.
    pub async fn move_message(
        &self,
        mailbox: &str,
        message_id: &str,
        destination: &FolderRef,
    ) -> Result<Value, GraphError> {
        let mailbox = require("mailbox", mailbox)?;
        let message_id = require("message id", message_id)?;

        let destination_id = match destination {
            FolderRef::Id(id) => require("folder id", id)?.to_string(),
            FolderRef::Name(name) => MailboxFolders::new(self.gateway)
                .folder_id(mailbox, name)
                .await?
                .ok_or_else(|| GraphError::NotFound(format!("folder '{name}' in {mailbox}")))?,
        };

        let url = self
            .gateway
            .endpoint(&["users", mailbox, "messages", message_id, "move"])?;
        let response = self
            .gateway
            .post(url.as_str(), &json!({ "destinationId": destination_id }))
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => Ok(response.json().unwrap_or(Value::Null)),
            _ => Err(response.error("error moving email to folder")),
        }
    }

    pub async fn forward_message(
        &self,
        mailbox: &str,
        message_id: &str,
        to: &str,
        comment: Option<&str>,
    ) -> Result<(), GraphError> {
        let mailbox = require("mailbox", mailbox)?;
        let message_id = require("message id", message_id)?;
        let to = require("to", to)?;

        let mut payload = json!({
            "toRecipients": [{ "emailAddress": { "address": to } }]
        });
        if let Some(comment) = comment.filter(|comment| !comment.is_empty()) {
            payload["comment"] = Value::String(comment.to_string());
        }

        let url = self
            .gateway
            .endpoint(&["users", mailbox, "messages", message_id, "forward"])?;
        let response = self.gateway.post(url.as_str(), &payload).await?;
        if !response.is_success() {
            return Err(response.error("error forwarding email"));
        }
        Ok(())
    }
}
