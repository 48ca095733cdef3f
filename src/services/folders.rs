use serde::{Deserialize, Serialize};

use crate::client::pagination::drain;
use crate::client::HttpGateway;
use crate::error::GraphError;
use crate::services::require;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailFolder {
    pub id: String,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
}

pub struct MailboxFolders<'a> {
    gateway: &'a HttpGateway,
}

impl<'a> MailboxFolders<'a> {
    pub fn new(gateway: &'a HttpGateway) -> Self {
        Self { gateway }
    }

    /// Every folder in the mailbox, drained through the folder delta feed.
    pub async fn list_folders(&self, mailbox: &str) -> Result<Vec<MailFolder>, GraphError> {
        let mailbox = require("mailbox", mailbox)?;
        let url = self.gateway.endpoint_with_query(
            &["users", mailbox, "mailFolders", "delta"],
            &[("$select", "displayName")],
        )?;

        let folders = drain(self.gateway, &url)
            .await?
            .into_iter()
            .filter(|item| item.get("@removed").is_none())
            .map(serde_json::from_value::<MailFolder>)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(folders)
    }

    pub async fn folder_id(
        &self,
        mailbox: &str,
        folder_name: &str,
    ) -> Result<Option<String>, GraphError> {
        if folder_name.trim().is_empty() {
            return Ok(None);
        }
        Ok(self
            .list_folders(mailbox)
            .await?
            .into_iter()
            .find(|folder| folder.display_name.as_deref() == Some(folder_name))
            .map(|folder| folder.id))
    }

    pub async fn folder_name(
        &self,
        mailbox: &str,
        folder_id: &str,
    ) -> Result<Option<String>, GraphError> {
        Ok(self
            .list_folders(mailbox)
            .await?
            .into_iter()
            .find(|folder| folder.id == folder_id)
            .and_then(|folder| folder.display_name))
    }

    pub async fn folder_exists(&self, mailbox: &str, folder_id: &str) -> Result<bool, GraphError> {
        Ok(self
            .list_folders(mailbox)
            .await?
            .iter()
            .any(|folder| folder.id == folder_id))
    }
}
