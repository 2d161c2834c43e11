//! NotiTiddy FFI Interface Definition
//!
//! This file defines the public interface exposed to Kotlin via UniFFI.
//! It acts as the source of truth for shared types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDS (Structs)
// ═══════════════════════════════════════════════════════════════════════════════

/// A notification captured from the platform, as persisted in the store.
///
/// `id` is 0 until the store assigns one on insert. `timestamp` is wall-clock
/// milliseconds since the Unix epoch. `is_read` and `is_removed` are
/// independent flags and neither ever goes back to false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct NotificationRecord {
    pub id: i64,
    pub package_name: String,
    pub app_name: String,
    pub title: Option<String>,
    /// `full_content` truncated for compact display (see `models::short_content_from`)
    pub short_content: Option<String>,
    pub full_content: Option<String>,
    pub timestamp: i64,
    pub is_read: bool,
    pub is_removed: bool,
}

/// One row of the main list: a single originating application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct AppSummaryRow {
    pub package_name: String,
    /// Label of the most recent record for the package
    pub app_name: String,
    /// Unread records in the package, capped at `UNREAD_BADGE_CAP`
    pub unread_count: u32,
    pub last_activity_time: i64,
}

/// Rendered text for a list row, produced by `render_row`
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct RowText {
    pub primary: String,
    pub secondary: Option<String>,
    /// Unread badge text; absent when there is nothing unread
    pub badge: Option<String>,
}

/// A single entry of the per-application detail list
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct DetailRow {
    pub record: NotificationRecord,
    /// Content shown collapsed: at most `DETAIL_PREVIEW_CHARS` plus an ellipsis
    pub preview: Option<String>,
    /// Whether `preview` was shortened (the row can be expanded)
    pub is_truncated: bool,
    pub timestamp_label: String,
}

/// Everything the detail screen for one application shows
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct DetailView {
    pub package_name: String,
    pub app_name: String,
    pub unread_label: String,
    pub rows: Vec<DetailRow>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENUMS
// ═══════════════════════════════════════════════════════════════════════════════

/// Raw events handed over by the platform's notification listener
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum PlatformEvent {
    Posted {
        package_name: String,
        title: Option<String>,
        text: Option<String>,
        big_text: Option<String>,
        text_lines: Option<Vec<String>>,
    },
    Removed {
        package_name: String,
    },
}

impl PlatformEvent {
    pub fn package_name(&self) -> &str {
        match self {
            PlatformEvent::Posted { package_name, .. } => package_name,
            PlatformEvent::Removed { package_name } => package_name,
        }
    }
}

/// Events republished to in-process subscribers after ingestion
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum NotificationEvent {
    /// `record.id` is 0 when the store write failed
    Posted { record: NotificationRecord },
    Removed { package_name: String },
}

/// Which slice of the store a watcher observes
#[derive(Debug, Clone, PartialEq, Eq, Hash, uniffi::Enum)]
pub enum WatchScope {
    All,
    /// Records not yet dismissed on the device
    Active,
    Package { package_name: String },
}

/// Tagged list row: either an application header or one of its notifications
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum ListRow {
    AppHeader { summary: AppSummaryRow },
    Notification { record: NotificationRecord },
}

/// Result of trying to open the application behind a notification
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum LaunchOutcome {
    Opened { message: String },
    Unavailable { message: String },
}

impl LaunchOutcome {
    /// Transient message to show the user
    pub fn message(&self) -> &str {
        match self {
            LaunchOutcome::Opened { message } | LaunchOutcome::Unavailable { message } => message,
        }
    }
}

/// Error type for NotiTiddy operations
#[derive(Debug, Error, uniffi::Error)]
pub enum TiddyError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Listener stopped")]
    ListenerStopped,
    #[error("Callback error: {0}")]
    CallbackError(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
// FOREIGN CAPABILITIES (implemented by the Android shell)
// ═══════════════════════════════════════════════════════════════════════════════

/// Package → human-readable label lookup (PackageManager on Android).
/// `None` means the package could not be resolved.
#[uniffi::export(with_foreign)]
pub trait AppLabelResolver: Send + Sync {
    fn resolve_label(&self, package_name: String) -> Option<String>;
}

/// Receives republished ingestion events, synchronously on the worker thread
#[uniffi::export(with_foreign)]
pub trait NotificationEventSubscriber: Send + Sync {
    fn on_event(&self, event: NotificationEvent);
}

/// Receives a fresh snapshot of a store scope whenever it changes
#[uniffi::export(with_foreign)]
pub trait SnapshotObserver: Send + Sync {
    fn on_snapshot(&self, records: Vec<NotificationRecord>);
}

/// Receives recomputed summary rows from a `NotificationFeed`
#[uniffi::export(with_foreign)]
pub trait FeedObserver: Send + Sync {
    fn on_rows(&self, rows: Vec<AppSummaryRow>);
}

/// Starts the originating application. Returns false when the package has no
/// launch target (uninstalled, or no launcher activity).
#[uniffi::export(with_foreign)]
pub trait AppLauncher: Send + Sync {
    fn launch_app(&self, package_name: String) -> bool;
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERVICE INTERFACE
// ═══════════════════════════════════════════════════════════════════════════════

/// Persistence contract the ingestion pipeline writes through.
/// Implemented by `NotificationStore`; foreign code may supply fakes.
#[uniffi::export(with_foreign)]
pub trait NotificationStoreApi: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────────
    // Read Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// All records, newest first
    fn fetch_all(&self) -> Result<Vec<NotificationRecord>, TiddyError>;

    /// Records not marked removed, newest first
    fn fetch_active(&self) -> Result<Vec<NotificationRecord>, TiddyError>;

    /// Records of one package, newest first
    fn fetch_by_package(&self, package_name: String) -> Result<Vec<NotificationRecord>, TiddyError>;

    fn fetch_by_id(&self, id: i64) -> Result<Option<NotificationRecord>, TiddyError>;

    fn count(&self) -> Result<u64, TiddyError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Write Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Insert a record and return its new ID. The record's own `id` is ignored.
    fn insert(&self, record: NotificationRecord) -> Result<i64, TiddyError>;

    /// Overwrite a stored record. Read/removed flags can only be raised.
    fn update(&self, record: NotificationRecord) -> Result<(), TiddyError>;

    /// Mark one record read. Returns false if it was already read or unknown.
    fn mark_read(&self, id: i64) -> Result<bool, TiddyError>;

    /// Mark every record of a package removed. Returns the number of records changed.
    fn mark_removed(&self, package_name: String) -> Result<u64, TiddyError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Delete Operations
    // ─────────────────────────────────────────────────────────────────────────────

    fn delete(&self, id: i64) -> Result<(), TiddyError>;

    /// Delete everything. Returns the number of records deleted.
    fn clear_all(&self) -> Result<u64, TiddyError>;
}

impl From<crate::database::DatabaseError> for TiddyError {
    fn from(e: crate::database::DatabaseError) -> Self {
        TiddyError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for TiddyError {
    fn from(e: serde_json::Error) -> Self {
        TiddyError::SerializationError(e.to_string())
    }
}

impl From<uniffi::UnexpectedUniFFICallbackError> for TiddyError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        TiddyError::CallbackError(e.reason)
    }
}
