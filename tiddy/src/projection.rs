//! Grouping projection: per-application summary rows for the main list
//!
//! Recomputed from scratch on every change. The working set is bounded by
//! what the device posts, so there is no incremental bookkeeping.

use crate::filter::filter_records;
use crate::interface::{AppSummaryRow, ListRow, NotificationRecord, RowText};
use crate::models::format_timestamp;
use std::collections::HashMap;

/// Largest unread count shown on a summary row
pub const UNREAD_BADGE_CAP: u32 = 99;

/// Running state for one package partition
struct Partition<'a> {
    latest: &'a NotificationRecord,
    unread: usize,
}

/// One row per distinct package, most recent activity first.
///
/// Ties on activity time are broken by ascending package name so the order
/// is fully deterministic. The row's app name comes from the package's most
/// recent record (first one seen on equal timestamps).
pub fn project(records: &[NotificationRecord]) -> Vec<AppSummaryRow> {
    let mut partitions: HashMap<&str, Partition> = HashMap::new();

    for record in records {
        let partition = partitions
            .entry(record.package_name.as_str())
            .or_insert(Partition { latest: record, unread: 0 });
        if record.timestamp > partition.latest.timestamp {
            partition.latest = record;
        }
        if !record.is_read {
            partition.unread += 1;
        }
    }

    let mut rows: Vec<AppSummaryRow> = partitions
        .into_iter()
        .map(|(package_name, partition)| AppSummaryRow {
            package_name: package_name.to_string(),
            app_name: partition.latest.app_name.clone(),
            unread_count: partition.unread.min(UNREAD_BADGE_CAP as usize) as u32,
            last_activity_time: partition.latest.timestamp,
        })
        .collect();

    rows.sort_by(|a, b| {
        b.last_activity_time
            .cmp(&a.last_activity_time)
            .then_with(|| a.package_name.cmp(&b.package_name))
    });
    rows
}

/// `project` over the records matching a raw search query
#[uniffi::export]
pub fn project_filtered(records: Vec<NotificationRecord>, query: String) -> Vec<AppSummaryRow> {
    project(&filter_records(&records, &query))
}

/// Flatten the projection into list rows. When `expanded_package` names a
/// visible package, its header is followed by its matching records, newest
/// first.
#[uniffi::export]
pub fn build_rows(
    records: Vec<NotificationRecord>,
    query: String,
    expanded_package: Option<String>,
) -> Vec<ListRow> {
    let filtered = filter_records(&records, &query);

    let mut rows = Vec::new();
    for summary in project(&filtered) {
        let expanded = expanded_package.as_deref() == Some(summary.package_name.as_str());
        let package_name = summary.package_name.clone();
        rows.push(ListRow::AppHeader { summary });

        if expanded {
            let mut children: Vec<&NotificationRecord> = filtered
                .iter()
                .filter(|record| record.package_name == package_name)
                .collect();
            children.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
            rows.extend(children.into_iter().map(|record| ListRow::Notification {
                record: record.clone(),
            }));
        }
    }
    rows
}

/// Text for any list row kind
#[uniffi::export]
pub fn render_row(row: ListRow) -> RowText {
    match row {
        ListRow::AppHeader { summary } => RowText {
            primary: summary.app_name,
            secondary: Some(format!("Last: {}", format_timestamp(summary.last_activity_time))),
            badge: (summary.unread_count > 0).then(|| summary.unread_count.to_string()),
        },
        ListRow::Notification { record } => RowText {
            primary: record.title.filter(|t| !t.is_empty()).unwrap_or(record.app_name),
            secondary: record.short_content,
            badge: None,
        },
    }
}
