pub mod json;
pub mod table;

use anyhow::Result;
use serde_json::Value;

use crate::client::PermissionReport;
use crate::services::{LicenseSku, MailFolder, PlanSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Table
        }
    }
}

pub fn format_messages(format: OutputFormat, messages: &[Value]) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(table::format_messages(messages)),
        OutputFormat::Json => json::to_pretty(messages),
    }
}

pub fn format_message(format: OutputFormat, message: &Value) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(table::format_message(message)),
        OutputFormat::Json => json::to_pretty(message),
    }
}

pub fn format_attachments(format: OutputFormat, attachments: &[Value]) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(table::format_attachments(attachments)),
        OutputFormat::Json => json::to_pretty(attachments),
    }
}

pub fn format_folders(format: OutputFormat, folders: &[MailFolder]) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(table::format_folders(folders)),
        OutputFormat::Json => json::to_pretty(folders),
    }
}

pub fn format_plans(format: OutputFormat, plans: &[PlanSummary]) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(table::format_plans(plans)),
        OutputFormat::Json => json::to_pretty(plans),
    }
}

pub fn format_tasks(format: OutputFormat, tasks: &[Value]) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(table::format_tasks(tasks)),
        OutputFormat::Json => json::to_pretty(tasks),
    }
}

pub fn format_users(format: OutputFormat, users: &[Value]) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(table::format_users(users)),
        OutputFormat::Json => json::to_pretty(users),
    }
}

pub fn format_licenses(format: OutputFormat, licenses: &[LicenseSku]) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(table::format_licenses(licenses)),
        OutputFormat::Json => json::to_pretty(licenses),
    }
}

pub fn format_permissions(format: OutputFormat, report: &PermissionReport) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(table::format_permissions(report)),
        OutputFormat::Json => json::to_pretty(report),
    }
}
