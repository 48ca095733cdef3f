use chrono::{DateTime, Utc};
use serde_json::Value;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::client::PermissionReport;
use crate::services::{LicenseSku, MailFolder, PlanSummary};

const FROM_WIDTH: usize = 24;
const SUBJECT_WIDTH: usize = 48;
const DATE_WIDTH: usize = 12;
const FLAG_WIDTH: usize = 3;
const NAME_WIDTH: usize = 32;
const TYPE_WIDTH: usize = 24;
const SIZE_WIDTH: usize = 10;
const TITLE_WIDTH: usize = 40;
const OWNER_WIDTH: usize = 28;
const MAIL_WIDTH: usize = 32;
const JOB_WIDTH: usize = 24;
const OFFICE_WIDTH: usize = 16;
const BODY_WRAP: usize = 100;

pub fn format_messages(messages: &[Value]) -> String {
    if messages.is_empty() {
        return "No messages found.".to_string();
    }

    let mut out = header(&[
        ("From", FROM_WIDTH),
        ("Subject", SUBJECT_WIDTH),
        ("Received", DATE_WIDTH),
        ("Att", FLAG_WIDTH),
        ("ID", 0),
    ]);
    for message in messages {
        let from = str_at(message, "/from/emailAddress/name")
            .or_else(|| str_at(message, "/from/emailAddress/address"))
            .unwrap_or("(unknown)");
        let attachments = if message.get("hasAttachments").and_then(Value::as_bool) == Some(true) {
            "yes"
        } else {
            ""
        };
        let received = relative_date(str_at(message, "/receivedDateTime").unwrap_or("-"));
        push_row(
            &mut out,
            &[
                (from, FROM_WIDTH),
                (str_at(message, "/subject").unwrap_or("(no subject)"), SUBJECT_WIDTH),
                (received.as_str(), DATE_WIDTH),
                (attachments, FLAG_WIDTH),
                (str_at(message, "/id").unwrap_or("-"), 0),
            ],
        );
    }
    out
}

pub fn format_message(message: &Value) -> String {
    let mut out = String::new();
    out.push_str(&format!("ID: {}\n", str_at(message, "/id").unwrap_or("-")));
    out.push_str(&format!(
        "Subject: {}\n",
        str_at(message, "/subject").unwrap_or("(no subject)")
    ));
    out.push_str(&format!(
        "From: {} <{}>\n",
        str_at(message, "/from/emailAddress/name").unwrap_or("(unknown)"),
        str_at(message, "/from/emailAddress/address").unwrap_or("(unknown)")
    ));

    let to = addresses(message, "toRecipients");
    if !to.is_empty() {
        out.push_str(&format!("To: {}\n", to.join(", ")));
    }
    let cc = addresses(message, "ccRecipients");
    if !cc.is_empty() {
        out.push_str(&format!("CC: {}\n", cc.join(", ")));
    }

    if let Some(received) = str_at(message, "/receivedDateTime") {
        out.push_str(&format!("Date: {received} ({})\n", relative_date(received)));
    }
    if message.get("hasAttachments").and_then(Value::as_bool) == Some(true) {
        out.push_str("Attachments: yes\n");
    }

    out.push('\n');
    out.push_str("Body\n");
    out.push_str("----\n");
    out.push_str(&message_body(message));
    out.push('\n');
    out
}

pub fn format_attachments(attachments: &[Value]) -> String {
    if attachments.is_empty() {
        return "No attachments.".to_string();
    }

    let mut out = header(&[
        ("Name", NAME_WIDTH),
        ("Type", TYPE_WIDTH),
        ("Size", SIZE_WIDTH),
        ("ID", 0),
    ]);
    for attachment in attachments {
        let size = attachment
            .get("size")
            .and_then(Value::as_u64)
            .map(|size| size.to_string())
            .unwrap_or_else(|| "-".to_string());
        push_row(
            &mut out,
            &[
                (str_at(attachment, "/name").unwrap_or("(unnamed)"), NAME_WIDTH),
                (str_at(attachment, "/contentType").unwrap_or("-"), TYPE_WIDTH),
                (size.as_str(), SIZE_WIDTH),
                (str_at(attachment, "/id").unwrap_or("-"), 0),
            ],
        );
    }
    out
}

pub fn format_folders(folders: &[MailFolder]) -> String {
    if folders.is_empty() {
        return "No folders found.".to_string();
    }

    let mut out = header(&[("Folder", NAME_WIDTH), ("ID", 0)]);
    for folder in folders {
        push_row(
            &mut out,
            &[
                (folder.display_name.as_deref().unwrap_or("(unnamed)"), NAME_WIDTH),
                (folder.id.as_str(), 0),
            ],
        );
    }
    out
}

pub fn format_plans(plans: &[PlanSummary]) -> String {
    if plans.is_empty() {
        return "No plans found.".to_string();
    }

    let mut out = header(&[("Title", TITLE_WIDTH), ("Owner", OWNER_WIDTH), ("ID", 0)]);
    for plan in plans {
        push_row(
            &mut out,
            &[
                (plan.title.as_str(), TITLE_WIDTH),
                (plan.owner.as_str(), OWNER_WIDTH),
                (plan.id.as_str(), 0),
            ],
        );
    }
    out
}

pub fn format_tasks(tasks: &[Value]) -> String {
    if tasks.is_empty() {
        return "No tasks found.".to_string();
    }

    let mut out = header(&[
        ("Title", TITLE_WIDTH),
        ("Done", 5),
        ("Due", DATE_WIDTH),
        ("ID", 0),
    ]);
    for task in tasks {
        let percent = task
            .get("percentComplete")
            .and_then(Value::as_u64)
            .map(|percent| format!("{percent}%"))
            .unwrap_or_else(|| "-".to_string());
        let due = str_at(task, "/dueDateTime")
            .and_then(|due| due.get(..10))
            .unwrap_or("-");
        push_row(
            &mut out,
            &[
                (str_at(task, "/title").unwrap_or("(untitled)"), TITLE_WIDTH),
                (percent.as_str(), 5),
                (due, DATE_WIDTH),
                (str_at(task, "/id").unwrap_or("-"), 0),
            ],
        );
        if let Some(body) = str_at(task, "/body").filter(|body| !body.trim().is_empty()) {
            out.push_str(&format!("    {}\n", truncate_for_width(body.trim(), BODY_WRAP)));
        }
    }
    out
}

pub fn format_users(users: &[Value]) -> String {
    if users.is_empty() {
        return "No users found.".to_string();
    }

    let mut out = header(&[
        ("Name", FROM_WIDTH),
        ("Mail", MAIL_WIDTH),
        ("Job Title", JOB_WIDTH),
        ("Office", OFFICE_WIDTH),
    ]);
    for user in users {
        push_row(
            &mut out,
            &[
                (str_at(user, "/displayName").unwrap_or("-"), FROM_WIDTH),
                (
                    str_at(user, "/mail")
                        .or_else(|| str_at(user, "/userPrincipalName"))
                        .unwrap_or("-"),
                    MAIL_WIDTH,
                ),
                (str_at(user, "/jobTitle").unwrap_or("-"), JOB_WIDTH),
                (str_at(user, "/officeLocation").unwrap_or("-"), OFFICE_WIDTH),
            ],
        );
    }
    out
}

pub fn format_licenses(licenses: &[LicenseSku]) -> String {
    if licenses.is_empty() {
        return "No licenses found.".to_string();
    }

    let mut out = header(&[
        ("License", NAME_WIDTH),
        ("Part Number", NAME_WIDTH),
        ("SKU ID", 0),
    ]);
    for license in licenses {
        push_row(
            &mut out,
            &[
                (license.friendly_name.as_str(), NAME_WIDTH),
                (license.sku_part_number.as_str(), NAME_WIDTH),
                (license.sku_id.as_str(), 0),
            ],
        );
    }
    out
}

pub fn format_permissions(report: &PermissionReport) -> String {
    let mut out = String::new();
    out.push_str("Application permissions\n");
    out.push_str("=======================\n");
    if report.application.is_empty() {
        out.push_str("(none)\n");
    }
    for role in &report.application {
        out.push_str(&format!("- {role}\n"));
    }

    if !report.delegated.is_empty() {
        out.push('\n');
        out.push_str("Delegated scopes\n");
        out.push_str("================\n");
        for scope in &report.delegated {
            out.push_str(&format!("- {scope}\n"));
        }
    }
    out
}

fn str_at<'v>(value: &'v Value, pointer: &str) -> Option<&'v str> {
    value.pointer(pointer).and_then(Value::as_str)
}

fn addresses(message: &Value, field: &str) -> Vec<String> {
    message
        .get(field)
        .and_then(Value::as_array)
        .map(|recipients| {
            recipients
                .iter()
                .filter_map(|recipient| str_at(recipient, "/emailAddress/address"))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn message_body(message: &Value) -> String {
    let content = str_at(message, "/body/content")
        .filter(|content| !content.trim().is_empty())
        .or_else(|| str_at(message, "/bodyPreview"));
    let Some(content) = content else {
        return "(empty)".to_string();
    };

    let is_html = str_at(message, "/body/contentType")
        .is_some_and(|kind| kind.eq_ignore_ascii_case("html"));
    if !is_html {
        return content.trim().to_string();
    }

    let plain = std::panic::catch_unwind(|| {
        html2text::from_read(content.as_bytes(), BODY_WRAP)
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    })
    .unwrap_or_default();
    if plain.is_empty() {
        "(empty)".to_string()
    } else {
        plain
    }
}

/// Header line plus dashes. A width of 0 marks a trailing column that is
/// printed in full.
fn header(columns: &[(&str, usize)]) -> String {
    let mut out = String::new();
    push_row(&mut out, columns);
    let rule = columns
        .iter()
        .map(|(title, width)| "-".repeat(if *width == 0 { title.len().max(8) } else { *width }))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(&rule);
    out.push('\n');
    out
}

fn push_row(out: &mut String, cells: &[(&str, usize)]) {
    let line = cells
        .iter()
        .map(|(value, width)| {
            if *width == 0 {
                value.to_string()
            } else {
                pad_to_width(&truncate_for_width(value, *width), *width)
            }
        })
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

fn pad_to_width(value: &str, width: usize) -> String {
    let used = UnicodeWidthStr::width(value);
    format!("{value}{}", " ".repeat(width.saturating_sub(used)))
}

fn relative_date(input: &str) -> String {
    let parsed = match DateTime::parse_from_rfc3339(input) {
        Ok(value) => value.with_timezone(&Utc),
        Err(_) => return input.to_string(),
    };

    let now = Utc::now();
    let delta = now.signed_duration_since(parsed);
    if delta.num_seconds() < 0 {
        return "in future".to_string();
    }
    if delta.num_minutes() < 1 {
        return "just now".to_string();
    }
    if delta.num_hours() < 1 {
        return format!("{}m ago", delta.num_minutes());
    }
    if delta.num_hours() < 24 {
        return format!("{}h ago", delta.num_hours());
    }
    if delta.num_days() == 1 {
        return "yesterday".to_string();
    }
    if delta.num_days() < 7 {
        return format!("{}d ago", delta.num_days());
    }
    parsed.format("%Y-%m-%d").to_string()
}

fn truncate_for_width(value: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(value) <= max_width {
        return value.to_string();
    }

    if max_width <= 1 {
        return "…".to_string();
    }

    let mut out = String::new();
    let mut width = 0usize;
    for c in value.chars() {
        let cw = UnicodeWidthChar::width(c).unwrap_or(0);
        if width + cw + 1 > max_width {
            break;
        }
        out.push(c);
        width += cw;
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use serde_json::json;
    use unicode_width::UnicodeWidthStr;

    use crate::client::PermissionReport;
    use crate::services::PlanSummary;

    use super::{
        format_message, format_messages, format_permissions, format_plans, relative_date,
        truncate_for_width,
    };

    fn sample_message() -> serde_json::Value {
        json!({
            "id": "AAMkAD-1",
            "subject": "A very long subject line that should be truncated in table output because it exceeds width",
            "from": { "emailAddress": { "name": "Sender Name", "address": "sender@example.com" } },
            "toRecipients": [{ "emailAddress": { "address": "owner@example.com" } }],
            "receivedDateTime": (Utc::now() - Duration::hours(2)).to_rfc3339(),
            "hasAttachments": true,
            "body": { "contentType": "html", "content": "<p>Hello <b>team</b></p>" }
        })
    }

    #[test]
    fn message_table_has_headers_and_full_ids() {
        let rendered = format_messages(&[sample_message()]);
        assert!(rendered.contains("From"));
        assert!(rendered.contains("Subject"));
        assert!(rendered.contains("Received"));
        assert!(rendered.contains("AAMkAD-1"));
        assert!(rendered.contains("2h ago"));
        assert!(rendered.contains('…'));
    }

    #[test]
    fn message_detail_renders_html_body_as_text() {
        let rendered = format_message(&sample_message());
        assert!(rendered.contains("From: Sender Name <sender@example.com>"));
        assert!(rendered.contains("To: owner@example.com"));
        assert!(rendered.contains("Hello"));
        assert!(!rendered.contains("<p>"));
    }

    #[test]
    fn empty_listings_say_so() {
        assert_eq!(format_messages(&[]), "No messages found.");
        assert_eq!(format_plans(&[]), "No plans found.");
    }

    #[test]
    fn plan_rows_include_owner() {
        let rendered = format_plans(&[PlanSummary {
            id: "plan-1".to_string(),
            title: "Launch".to_string(),
            owner: "Ada Lovelace".to_string(),
        }]);
        assert!(rendered.lines().nth(2).is_some_and(|row| row.contains("Ada Lovelace")));
    }

    #[test]
    fn permissions_list_roles() {
        let rendered = format_permissions(&PermissionReport {
            application: vec!["Mail.Send".to_string()],
            delegated: vec![],
        });
        assert!(rendered.contains("- Mail.Send"));
        assert!(!rendered.contains("Delegated"));
    }

    #[test]
    fn truncation_respects_display_width() {
        let truncated = truncate_for_width("日本語のメールの件名", 9);
        assert!(UnicodeWidthStr::width(truncated.as_str()) <= 9);
        assert!(truncated.ends_with('…'));
        assert_eq!(truncate_for_width("short", 10), "short");
    }

    #[test]
    fn relative_date_passes_through_unparseable_input() {
        assert_eq!(relative_date("not a date"), "not a date");
        assert_eq!(relative_date("2020-01-02T03:04:05Z"), "2020-01-02");
    }
}
