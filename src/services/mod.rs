//! Resource clients. Each borrows the gateway and builds its own URLs; none
//! share state beyond it.

pub mod email;
pub mod folders;
pub mod planner;
pub mod users;

pub use email::{AttachmentContent, BodyType, EmailClient, FolderRef, OutgoingMail};
pub use folders::{MailFolder, MailboxFolders};
pub use planner::{PlanSummary, PlannerClient};
pub use users::{friendly_sku_name, LicenseSku, UserSummary, UserView, UsersClient};

use crate::error::GraphError;

pub(crate) fn require<'v>(field: &'static str, value: &'v str) -> Result<&'v str, GraphError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(GraphError::validation(field, "must be a non-empty string"));
    }
    Ok(trimmed)
}
