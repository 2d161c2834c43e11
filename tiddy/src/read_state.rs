//! Read-state tracking for the detail screen

use crate::detail::detail_row;
use crate::interface::{DetailRow, NotificationStoreApi, TiddyError};
use crate::store::NotificationStore;
use std::sync::Arc;
use tracing::debug;

/// Marks records read as the user opens them. Watchers of the store see the
/// change through the store's own notification.
#[derive(uniffi::Object)]
pub struct ReadStateTracker {
    store: Arc<NotificationStore>,
}

#[uniffi::export]
impl ReadStateTracker {
    #[uniffi::constructor]
    pub fn new(store: Arc<NotificationStore>) -> Self {
        Self { store }
    }

    /// Returns whether the record went from unread to read
    pub fn mark_read(&self, id: i64) -> Result<bool, TiddyError> {
        let changed = self.store.mark_read(id)?;
        debug!(id, changed, "mark_read");
        Ok(changed)
    }

    /// Mark the record read and return its detail row. `None` for an unknown ID.
    pub fn open_detail(&self, id: i64) -> Result<Option<DetailRow>, TiddyError> {
        self.mark_read(id)?;
        Ok(self.store.fetch_by_id(id)?.map(detail_row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::{NotificationRecord, SnapshotObserver, WatchScope};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Counter(Mutex<usize>);

    impl SnapshotObserver for Counter {
        fn on_snapshot(&self, _records: Vec<NotificationRecord>) {
            *self.0.lock() += 1;
        }
    }

    fn setup() -> (Arc<NotificationStore>, ReadStateTracker, i64) {
        let store = Arc::new(NotificationStore::in_memory().unwrap());
        let id = store
            .insert(NotificationRecord::from_posted(
                "com.slack".into(),
                "Slack".into(),
                Some("#general".into()),
                Some("Team lunch today at noon."),
                None,
                None,
                1_000,
            ))
            .unwrap();
        let tracker = ReadStateTracker::new(store.clone());
        (store, tracker, id)
    }

    #[test]
    fn test_mark_read_once() {
        let (store, tracker, id) = setup();
        let counter = Arc::new(Counter::default());
        store.watch(WatchScope::All, counter.clone()).unwrap();

        assert!(tracker.mark_read(id).unwrap());
        assert!(!tracker.mark_read(id).unwrap());
        assert!(store.fetch_by_id(id).unwrap().unwrap().is_read);
        // initial snapshot plus exactly one change
        assert_eq!(*counter.0.lock(), 2);
    }

    #[test]
    fn test_open_detail_returns_read_row() {
        let (_store, tracker, id) = setup();
        let row = tracker.open_detail(id).unwrap().unwrap();
        assert!(row.record.is_read);
        assert_eq!(row.preview.as_deref(), Some("Team lunch today at noon."));
        assert!(!row.is_truncated);
    }

    #[test]
    fn test_open_detail_unknown_id() {
        let (_store, tracker, _id) = setup();
        assert!(tracker.open_detail(4242).unwrap().is_none());
        assert!(!tracker.mark_read(4242).unwrap());
    }
}
