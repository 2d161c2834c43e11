//! Per-application detail view

use crate::interface::{DetailRow, DetailView, NotificationRecord};
use crate::models::{format_timestamp, truncate_with_ellipsis};

/// Characters of content shown before a detail row is expanded
pub const DETAIL_PREVIEW_CHARS: usize = 100;

/// Build the detail row for one record
pub fn detail_row(record: NotificationRecord) -> DetailRow {
    let (preview, is_truncated) = match record.display_content() {
        Some(content) => {
            let (preview, truncated) = truncate_with_ellipsis(content, DETAIL_PREVIEW_CHARS);
            (Some(preview), truncated)
        }
        None => (None, false),
    };
    let timestamp_label = format_timestamp(record.timestamp);
    DetailRow {
        record,
        preview,
        is_truncated,
        timestamp_label,
    }
}

/// Detail screen for one application, rows in the order given
#[uniffi::export]
pub fn build_detail_view(
    package_name: String,
    app_name: String,
    records: Vec<NotificationRecord>,
) -> DetailView {
    let unread = records.iter().filter(|r| !r.is_read).count();
    DetailView {
        package_name,
        app_name,
        unread_label: unread_label(u32::try_from(unread).unwrap_or(u32::MAX)),
        rows: records.into_iter().map(detail_row).collect(),
    }
}

#[uniffi::export]
pub fn unread_label(count: u32) -> String {
    if count == 1 {
        "1 unread notification".to_string()
    } else {
        format!("{} unread notifications", count)
    }
}

/// Plain-text summary copied to the clipboard from a detail row
#[uniffi::export]
pub fn clipboard_text(record: NotificationRecord) -> String {
    let mut text = format!("App: {}\n", record.app_name);
    if let Some(title) = record.title.as_deref().filter(|t| !t.is_empty()) {
        text.push_str(&format!("Title: {}\n", title));
    }
    text.push_str(&format!("Content: {}\n", record.display_content().unwrap_or_default()));
    text.push_str(&format!("Time: {}", format_timestamp(record.timestamp)));
    text
}
