//! Normalization of raw platform notifications into stored records

use crate::interface::{NotificationRecord, PlatformEvent};
use chrono::{Local, TimeZone};

/// Characters of `full_content` kept in `short_content`
pub const SHORT_CONTENT_CHARS: usize = 50;

/// Appended whenever text is cut short
pub const ELLIPSIS: &str = "...";

/// Display format for record timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a millisecond timestamp in the device's local time zone
pub fn format_timestamp(timestamp_ms: i64) -> String {
    format_timestamp_in(timestamp_ms, &Local)
}

/// Format a millisecond timestamp in `tz`. Out-of-range values render empty.
pub fn format_timestamp_in<Tz: TimeZone>(timestamp_ms: i64, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    tz.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}

/// First `max_chars` characters of `text` plus `ELLIPSIS` when it is longer,
/// otherwise `text` unchanged. Counts Unicode scalar values, never splits one.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            let mut truncated = String::with_capacity(cut + ELLIPSIS.len());
            truncated.push_str(&text[..cut]);
            truncated.push_str(ELLIPSIS);
            (truncated, true)
        }
        None => (text.to_string(), false),
    }
}

/// Most complete content available: expanded text, then the multi-line
/// array joined by newlines, then the plain text.
pub fn full_content_from(
    text: Option<&str>,
    big_text: Option<&str>,
    text_lines: Option<&[String]>,
) -> Option<String> {
    if let Some(big) = big_text {
        return Some(big.to_string());
    }
    match text_lines {
        Some(lines) if !lines.is_empty() => Some(lines.join("\n")),
        _ => text.map(str::to_string),
    }
}

pub fn short_content_from(full_content: Option<&str>) -> Option<String> {
    full_content.map(|full| truncate_with_ellipsis(full, SHORT_CONTENT_CHARS).0)
}

impl NotificationRecord {
    /// Build an unsaved record from the fields of a posted notification
    pub fn from_posted(
        package_name: String,
        app_name: String,
        title: Option<String>,
        text: Option<&str>,
        big_text: Option<&str>,
        text_lines: Option<&[String]>,
        timestamp: i64,
    ) -> Self {
        let full_content = full_content_from(text, big_text, text_lines);
        let short_content = short_content_from(full_content.as_deref());
        Self {
            id: 0,
            package_name,
            app_name,
            title,
            short_content,
            full_content,
            timestamp,
            is_read: false,
            is_removed: false,
        }
    }

    /// Build an unsaved record from a `PlatformEvent::Posted`.
    /// Returns `None` for `Removed` events.
    pub fn from_event(event: &PlatformEvent, app_name: String, timestamp: i64) -> Option<Self> {
        match event {
            PlatformEvent::Posted { package_name, title, text, big_text, text_lines } => {
                Some(Self::from_posted(
                    package_name.clone(),
                    app_name,
                    title.clone(),
                    text.as_deref(),
                    big_text.as_deref(),
                    text_lines.as_deref(),
                    timestamp,
                ))
            }
            PlatformEvent::Removed { .. } => None,
        }
    }

    /// Content for display in full: the untruncated text when it has
    /// something to show, otherwise the short form.
    pub fn display_content(&self) -> Option<&str> {
        match self.full_content.as_deref() {
            Some(full) if !full.trim().is_empty() => Some(full),
            _ => self.short_content.as_deref(),
        }
    }
}
