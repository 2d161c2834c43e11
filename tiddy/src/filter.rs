//! Case-insensitive substring filter applied before grouping

use crate::interface::NotificationRecord;

/// Lower-case and trim a raw search query. Done once per query change.
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Whether `record` matches an already-normalized query.
///
/// Fields are checked in order app name, title, short content, full content;
/// the first hit wins. Absent fields never match.
pub fn matches(record: &NotificationRecord, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let contains = |field: Option<&str>| {
        field.is_some_and(|text| text.to_lowercase().contains(query))
    };
    contains(Some(&record.app_name))
        || contains(record.title.as_deref())
        || contains(record.short_content.as_deref())
        || contains(record.full_content.as_deref())
}

/// Records matching `query` (raw, normalized here), in input order
pub fn filter_records(records: &[NotificationRecord], query: &str) -> Vec<NotificationRecord> {
    let query = normalize_query(query);
    records
        .iter()
        .filter(|record| matches(record, &query))
        .cloned()
        .collect()
}

/// Whether `record` matches a raw search query as typed by the user
#[uniffi::export]
pub fn record_matches(record: NotificationRecord, query: String) -> bool {
    matches(&record, &normalize_query(&query))
}
