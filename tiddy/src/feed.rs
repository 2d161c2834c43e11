//! NotificationFeed - UI-side holder of the observed snapshot and search query
//!
//! The feed owns no data of its own: every store change arrives as a fresh
//! snapshot, and rows are recomputed from that snapshot and the current query.
//! Recompute and push share one delivery lock, so the observer always ends on
//! the rows `rows()` returns.

use crate::filter::filter_records;
use crate::interface::{
    AppSummaryRow, FeedObserver, ListRow, NotificationRecord, SnapshotObserver, TiddyError,
    WatchScope,
};
use crate::projection::{build_rows, project};
use crate::store::NotificationStore;
use parking_lot::{Mutex, ReentrantMutex};
use std::sync::Arc;
use tracing::trace;

#[derive(Default)]
struct FeedState {
    snapshot: Vec<NotificationRecord>,
    /// Raw query as typed
    query: String,
    rows: Vec<AppSummaryRow>,
}

impl FeedState {
    fn recompute(&mut self) -> Vec<AppSummaryRow> {
        self.rows = project(&filter_records(&self.snapshot, &self.query));
        self.rows.clone()
    }
}

#[derive(uniffi::Object)]
pub struct NotificationFeed {
    state: Mutex<FeedState>,
    /// Held across recompute and push; re-entrant so observers may call back in
    delivery: ReentrantMutex<()>,
    observer: Arc<dyn FeedObserver>,
}

impl NotificationFeed {
    fn push(&self, rows: Vec<AppSummaryRow>) {
        trace!(rows = rows.len(), "Pushing feed rows");
        self.observer.on_rows(rows);
    }
}

#[uniffi::export]
impl NotificationFeed {
    #[uniffi::constructor]
    pub fn new(observer: Arc<dyn FeedObserver>) -> Self {
        Self {
            state: Mutex::new(FeedState::default()),
            delivery: ReentrantMutex::new(()),
            observer,
        }
    }

    /// Replace the snapshot and push recomputed rows
    pub fn apply_snapshot(&self, records: Vec<NotificationRecord>) {
        let _delivery = self.delivery.lock();
        let rows = {
            let mut state = self.state.lock();
            state.snapshot = records;
            state.recompute()
        };
        self.push(rows);
    }

    /// Change the search query. Returns the recomputed rows, which are also
    /// pushed to the observer.
    pub fn set_query(&self, query: String) -> Vec<AppSummaryRow> {
        let _delivery = self.delivery.lock();
        let rows = {
            let mut state = self.state.lock();
            state.query = query;
            state.recompute()
        };
        self.push(rows.clone());
        rows
    }

    pub fn rows(&self) -> Vec<AppSummaryRow> {
        self.state.lock().rows.clone()
    }

    pub fn query(&self) -> String {
        self.state.lock().query.clone()
    }

    /// Records of one package that match the current query, newest first
    pub fn records_for(&self, package_name: String) -> Vec<NotificationRecord> {
        let state = self.state.lock();
        let mut records: Vec<NotificationRecord> = filter_records(&state.snapshot, &state.query)
            .into_iter()
            .filter(|r| r.package_name == package_name)
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
        records
    }

    /// Header rows, with `expanded_package` opened to show its records
    pub fn list_rows(&self, expanded_package: Option<String>) -> Vec<ListRow> {
        let (snapshot, query) = {
            let state = self.state.lock();
            (state.snapshot.clone(), state.query.clone())
        };
        build_rows(snapshot, query, expanded_package)
    }

    /// Register this feed as a store watcher. Rows are pushed once for the
    /// initial snapshot before this returns.
    pub fn attach(self: Arc<Self>, store: Arc<NotificationStore>, scope: WatchScope) -> Result<u64, TiddyError> {
        store.watch(scope, self)
    }
}

impl SnapshotObserver for NotificationFeed {
    fn on_snapshot(&self, records: Vec<NotificationRecord>) {
        self.apply_snapshot(records);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::NotificationStoreApi;

    #[derive(Default)]
    struct RowSink(Mutex<Vec<Vec<AppSummaryRow>>>);

    impl FeedObserver for RowSink {
        fn on_rows(&self, rows: Vec<AppSummaryRow>) {
            self.0.lock().push(rows);
        }
    }

    impl RowSink {
        fn last(&self) -> Vec<AppSummaryRow> {
            self.0.lock().last().cloned().unwrap_or_default()
        }
    }

    fn rec(id: i64, package: &str, title: &str, timestamp: i64, is_read: bool) -> NotificationRecord {
        let mut r = NotificationRecord::from_posted(
            package.into(),
            package.to_uppercase(),
            Some(title.into()),
            Some("body"),
            None,
            None,
            timestamp,
        );
        r.id = id;
        r.is_read = is_read;
        r
    }

    #[test]
    fn test_apply_snapshot_pushes_rows() {
        let sink = Arc::new(RowSink::default());
        let feed = NotificationFeed::new(sink.clone());
        feed.apply_snapshot(vec![
            rec(1, "x", "a", 100, false),
            rec(2, "x", "b", 200, true),
            rec(3, "y", "c", 150, false),
        ]);

        let rows = sink.last();
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].package_name.as_str(), rows[0].unread_count, rows[0].last_activity_time), ("x", 1, 200));
        assert_eq!((rows[1].package_name.as_str(), rows[1].unread_count, rows[1].last_activity_time), ("y", 1, 150));
        assert_eq!(feed.rows(), rows);
    }

    #[test]
    fn test_query_survives_new_snapshots() {
        let sink = Arc::new(RowSink::default());
        let feed = NotificationFeed::new(sink.clone());
        feed.apply_snapshot(vec![rec(1, "x", "lunch", 100, false), rec(2, "y", "other", 200, false)]);

        let rows = feed.set_query("LUNCH".into());
        assert_eq!(rows.len(), 1);
        assert_eq!(feed.query(), "LUNCH");

        feed.apply_snapshot(vec![
            rec(1, "x", "lunch", 100, false),
            rec(2, "y", "other", 200, false),
            rec(3, "z", "lunch again", 300, false),
        ]);
        let packages: Vec<String> = sink.last().into_iter().map(|r| r.package_name).collect();
        assert_eq!(packages, vec!["z".to_string(), "x".to_string()]);
    }

    #[test]
    fn test_records_for_filters_and_sorts() {
        let feed = NotificationFeed::new(Arc::new(RowSink::default()));
        feed.apply_snapshot(vec![
            rec(1, "x", "lunch", 100, false),
            rec(2, "x", "dinner", 300, false),
            rec(3, "x", "lunch later", 200, false),
            rec(4, "y", "lunch", 400, false),
        ]);
        let ids: Vec<i64> = feed.records_for("x".into()).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);

        feed.set_query("lunch".into());
        let ids: Vec<i64> = feed.records_for("x".into()).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn test_list_rows_expansion() {
        let feed = NotificationFeed::new(Arc::new(RowSink::default()));
        feed.apply_snapshot(vec![rec(1, "x", "a", 100, false), rec(2, "y", "b", 200, false)]);
        let rows = feed.list_rows(Some("x".into()));
        assert_eq!(rows.len(), 3);
        assert!(matches!(&rows[2], ListRow::Notification { record } if record.id == 1));
    }

    #[test]
    fn test_attach_follows_store_changes() {
        let store = Arc::new(NotificationStore::in_memory().unwrap());
        let sink = Arc::new(RowSink::default());
        let feed = Arc::new(NotificationFeed::new(sink.clone()));

        let watch_id = feed.clone().attach(store.clone(), WatchScope::All).unwrap();
        assert_eq!(sink.0.lock().len(), 1);
        assert!(sink.last().is_empty());

        let id = store.insert(rec(0, "x", "hello", 100, false)).unwrap();
        assert_eq!(sink.last()[0].unread_count, 1);

        store.mark_read(id).unwrap();
        assert_eq!(sink.last()[0].unread_count, 0);

        assert!(store.unwatch(watch_id));
        store.insert(rec(0, "y", "later", 200, false)).unwrap();
        assert_eq!(feed.rows().len(), 1);
    }

    /// Sink that parks inside the first two-row push until released
    struct ParkingSink {
        pushes: Mutex<Vec<Vec<AppSummaryRow>>>,
        parked: Mutex<Option<std::sync::mpsc::Sender<()>>>,
        release: Mutex<std::sync::mpsc::Receiver<()>>,
    }

    impl FeedObserver for ParkingSink {
        fn on_rows(&self, rows: Vec<AppSummaryRow>) {
            let parked = if rows.len() == 2 { self.parked.lock().take() } else { None };
            if let Some(parked) = parked {
                parked.send(()).unwrap();
                self.release.lock().recv().unwrap();
            }
            self.pushes.lock().push(rows);
        }
    }

    #[test]
    fn test_query_change_during_slow_push_ends_on_current_rows() {
        let (parked_tx, parked_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        let sink = Arc::new(ParkingSink {
            pushes: Mutex::new(Vec::new()),
            parked: Mutex::new(Some(parked_tx)),
            release: Mutex::new(release_rx),
        });
        let feed = Arc::new(NotificationFeed::new(sink.clone()));

        let snapshot = {
            let feed = feed.clone();
            std::thread::spawn(move || {
                feed.apply_snapshot(vec![rec(1, "x", "lunch", 100, false), rec(2, "y", "other", 200, false)])
            })
        };
        parked_rx.recv().unwrap();

        let query = {
            let feed = feed.clone();
            std::thread::spawn(move || feed.set_query("lunch".into()))
        };
        std::thread::sleep(std::time::Duration::from_millis(50));
        release_tx.send(()).unwrap();
        snapshot.join().unwrap();
        query.join().unwrap();

        let last = sink.pushes.lock().last().cloned().unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last, feed.rows());
    }

    #[test]
    fn test_observer_may_read_feed_from_callback() {
        struct Echo(Mutex<Option<Arc<NotificationFeed>>>, Mutex<Vec<usize>>);
        impl FeedObserver for Echo {
            fn on_rows(&self, rows: Vec<AppSummaryRow>) {
                let feed = self.0.lock().clone();
                if let Some(feed) = feed {
                    assert_eq!(feed.rows(), rows);
                }
                self.1.lock().push(rows.len());
            }
        }

        let echo = Arc::new(Echo(Mutex::new(None), Mutex::new(Vec::new())));
        let feed = Arc::new(NotificationFeed::new(echo.clone()));
        *echo.0.lock() = Some(feed.clone());
        feed.apply_snapshot(vec![rec(1, "x", "a", 100, false)]);
        assert_eq!(echo.1.lock().as_slice(), &[1]);
    }
}
