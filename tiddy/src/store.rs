//! NotificationStore - SQLite-backed store exported to Kotlin
//!
//! Observation model: watchers register with a `WatchScope` and receive the
//! scope's current snapshot right away, then again after every mutation that
//! changed at least one row. Callbacks run synchronously on the mutating
//! thread, after the write has committed. Fetch and delivery happen under one
//! delivery lock, so the last snapshot a watcher receives always reflects every
//! committed write. The lock is re-entrant: an observer may call back into the
//! store from its callback.

use crate::database::Database;
use crate::interface::{
    NotificationRecord, NotificationStoreApi, SnapshotObserver, TiddyError, WatchScope,
};
use parking_lot::{Mutex, ReentrantMutex};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

struct Watcher {
    scope: WatchScope,
    observer: Arc<dyn SnapshotObserver>,
}

/// Thread-safe notification store over SQLite
///
/// Concurrency Model:
/// - Database uses r2d2 connection pool (concurrent reads, no mutex blocking)
/// - Each mutation is a single statement; no transaction spans operations
/// - The watcher registry has its own lock, never held while calling out
/// - Snapshot delivery is serialized by `delivery`, taken after the write commits
#[derive(uniffi::Object)]
pub struct NotificationStore {
    db: Arc<Database>,
    watchers: Mutex<BTreeMap<u64, Watcher>>,
    /// Serializes snapshot fetch + delivery across mutating threads
    delivery: ReentrantMutex<()>,
    next_watch_id: AtomicU64,
}

// Internal implementation (not exported via FFI)
impl NotificationStore {
    fn from_database(db: Database) -> Self {
        Self {
            db: Arc::new(db),
            watchers: Mutex::new(BTreeMap::new()),
            delivery: ReentrantMutex::new(()),
            next_watch_id: AtomicU64::new(1),
        }
    }

    fn fetch_scope(&self, scope: &WatchScope) -> Result<Vec<NotificationRecord>, TiddyError> {
        let records = match scope {
            WatchScope::All => self.db.fetch_all()?,
            WatchScope::Active => self.db.fetch_active()?,
            WatchScope::Package { package_name } => self.db.fetch_by_package(package_name)?,
        };
        Ok(records)
    }

    /// Push fresh snapshots to every watcher
    fn notify_watchers(&self) {
        let _delivery = self.delivery.lock();
        let watchers: Vec<(u64, WatchScope, Arc<dyn SnapshotObserver>)> = self
            .watchers
            .lock()
            .iter()
            .map(|(id, w)| (*id, w.scope.clone(), Arc::clone(&w.observer)))
            .collect();

        for (id, scope, observer) in watchers {
            match self.fetch_scope(&scope) {
                Ok(records) => observer.on_snapshot(records),
                Err(e) => warn!(watch_id = id, error = %e, "Failed to refresh watcher snapshot"),
            }
        }
    }

    fn notify_if_changed(&self, changed: usize) {
        if changed > 0 {
            self.notify_watchers();
        }
    }

    fn validate(record: &NotificationRecord) -> Result<(), TiddyError> {
        if record.package_name.is_empty() {
            return Err(TiddyError::InvalidInput("Empty package name".into()));
        }
        Ok(())
    }
}

// FFI-exported constructors (must be in standalone impl block)
#[uniffi::export]
impl NotificationStore {
    /// Open (or create) the store at the given database path
    #[uniffi::constructor]
    pub fn new(db_path: String) -> Result<Self, TiddyError> {
        let path = PathBuf::from(db_path);
        let db = Database::open(&path)?;
        info!(path = %path.display(), "Opened notification store");
        Ok(Self::from_database(db))
    }

    /// Store backed by an in-memory database (previews and tests)
    #[uniffi::constructor]
    pub fn in_memory() -> Result<Self, TiddyError> {
        let db = Database::open_in_memory()?;
        Ok(Self::from_database(db))
    }
}

// Observation and export (not on the trait, foreign fakes don't need them)
#[uniffi::export]
impl NotificationStore {
    /// Register an observer for a scope. It receives the current snapshot
    /// before this returns. Returns the watch ID for `unwatch`.
    pub fn watch(&self, scope: WatchScope, observer: Arc<dyn SnapshotObserver>) -> Result<u64, TiddyError> {
        // Registration and the initial fetch share the delivery lock, so a write
        // committed in between is either in `initial` or delivered afterwards
        let _delivery = self.delivery.lock();
        let initial = self.fetch_scope(&scope)?;
        let id = self.next_watch_id.fetch_add(1, Ordering::Relaxed);
        self.watchers.lock().insert(
            id,
            Watcher { scope: scope.clone(), observer: Arc::clone(&observer) },
        );
        debug!(watch_id = id, ?scope, "Watcher registered");
        observer.on_snapshot(initial);
        Ok(id)
    }

    /// Remove a watcher. Returns false for an unknown ID.
    pub fn unwatch(&self, watch_id: u64) -> bool {
        self.watchers.lock().remove(&watch_id).is_some()
    }

    /// All records as pretty-printed JSON, newest first
    pub fn export_json(&self) -> Result<String, TiddyError> {
        let records = self.db.fetch_all()?;
        Ok(serde_json::to_string_pretty(&records)?)
    }
}

#[uniffi::export]
impl NotificationStoreApi for NotificationStore {
    // ─────────────────────────────────────────────────────────────────────────────
    // Read Operations
    // ─────────────────────────────────────────────────────────────────────────────

    fn fetch_all(&self) -> Result<Vec<NotificationRecord>, TiddyError> {
        Ok(self.db.fetch_all()?)
    }

    fn fetch_active(&self) -> Result<Vec<NotificationRecord>, TiddyError> {
        Ok(self.db.fetch_active()?)
    }

    fn fetch_by_package(&self, package_name: String) -> Result<Vec<NotificationRecord>, TiddyError> {
        Ok(self.db.fetch_by_package(&package_name)?)
    }

    fn fetch_by_id(&self, id: i64) -> Result<Option<NotificationRecord>, TiddyError> {
        Ok(self.db.fetch_by_id(id)?)
    }

    fn count(&self) -> Result<u64, TiddyError> {
        Ok(self.db.count()?)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Write Operations
    // ─────────────────────────────────────────────────────────────────────────────

    fn insert(&self, record: NotificationRecord) -> Result<i64, TiddyError> {
        Self::validate(&record)?;
        let id = self.db.insert(&record)?;
        debug!(id, package = %record.package_name, "Inserted notification");
        self.notify_watchers();
        Ok(id)
    }

    fn update(&self, record: NotificationRecord) -> Result<(), TiddyError> {
        Self::validate(&record)?;
        if record.id <= 0 {
            return Err(TiddyError::InvalidInput("Record has no ID".into()));
        }
        let changed = self.db.update(&record)?;
        if changed == 0 {
            return Err(TiddyError::InvalidInput(format!("No record with ID {}", record.id)));
        }
        self.notify_watchers();
        Ok(())
    }

    fn mark_read(&self, id: i64) -> Result<bool, TiddyError> {
        let changed = self.db.mark_read(id)?;
        if changed {
            self.notify_watchers();
        }
        Ok(changed)
    }

    fn mark_removed(&self, package_name: String) -> Result<u64, TiddyError> {
        let changed = self.db.mark_removed(&package_name)?;
        debug!(package = %package_name, changed, "Marked package removed");
        self.notify_if_changed(changed);
        Ok(changed as u64)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Delete Operations
    // ─────────────────────────────────────────────────────────────────────────────

    fn delete(&self, id: i64) -> Result<(), TiddyError> {
        let changed = self.db.delete(id)?;
        self.notify_if_changed(changed);
        Ok(())
    }

    fn clear_all(&self) -> Result<u64, TiddyError> {
        let deleted = self.db.clear_all()?;
        info!(deleted, "Cleared all notifications");
        self.notify_if_changed(deleted);
        Ok(deleted as u64)
    }
}
