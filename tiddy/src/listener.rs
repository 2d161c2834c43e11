//! IngestionListener - boundary between the platform's notification
//! listener and the store.
//!
//! Platform callbacks (`on_posted`, `on_removed`, `submit`) only stamp the
//! time and enqueue a `PlatformEvent`; they never block and never fail. A
//! single worker task drains the queue in order, runs label lookup and the
//! store write on tokio's blocking pool, then republishes the event to
//! in-process subscribers. Store failures are logged and dropped; the event
//! is published regardless.

use crate::events::EventBus;
use crate::interface::{
    AppLabelResolver, NotificationEvent, NotificationEventSubscriber, NotificationRecord,
    NotificationStoreApi, PlatformEvent, TiddyError,
};
use chrono::Utc;
use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Global fallback Tokio runtime for when the listener is created outside any runtime context.
/// Shared across all listeners and never dropped.
/// Used by UniFFI which doesn't provide a tokio runtime.
static FALLBACK_RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("tiddy-ingest")
        .enable_all()
        .build()
        .expect("Failed to create fallback tokio runtime")
});

/// Current runtime if there is one, otherwise the global fallback
fn runtime_handle() -> tokio::runtime::Handle {
    tokio::runtime::Handle::try_current()
        .unwrap_or_else(|_| FALLBACK_RUNTIME.handle().clone())
}

/// RAII guard that cancels a token when dropped.
/// Dropping the listener (Kotlin `close()`/GC) stops its worker.
struct DropGuard {
    token: CancellationToken,
}

impl DropGuard {
    fn new(token: CancellationToken) -> Self {
        Self { token }
    }
}

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

enum Command {
    Event { event: PlatformEvent, received_at: i64 },
    Flush(oneshot::Sender<()>),
}

/// Receives platform notification events and feeds the store.
#[derive(uniffi::Object)]
pub struct IngestionListener {
    sender: mpsc::UnboundedSender<Command>,
    bus: Arc<EventBus>,
    token: CancellationToken,
    _guard: DropGuard,
}

// Internal implementation (not exported via FFI)
impl IngestionListener {
    fn enqueue(&self, event: PlatformEvent) {
        if event.package_name().is_empty() {
            warn!("Dropping platform event without package name");
            return;
        }
        let command = Command::Event {
            event,
            received_at: Utc::now().timestamp_millis(),
        };
        if self.sender.send(command).is_err() {
            warn!("Ingestion listener stopped, dropping platform event");
        }
    }
}

#[uniffi::export]
impl IngestionListener {
    /// Start a listener writing to `store`, resolving labels through `resolver`
    #[uniffi::constructor]
    pub fn new(store: Arc<dyn NotificationStoreApi>, resolver: Arc<dyn AppLabelResolver>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let bus = Arc::new(EventBus::new());
        let token = CancellationToken::new();

        let worker = Worker {
            store,
            resolver,
            bus: Arc::clone(&bus),
        };
        runtime_handle().spawn(worker.run(receiver, token.clone()));
        info!("Ingestion listener started");

        Self {
            sender,
            bus,
            token: token.clone(),
            _guard: DropGuard::new(token),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Platform callbacks
    // ─────────────────────────────────────────────────────────────────────────────

    /// A notification was posted. Returns immediately.
    pub fn on_posted(
        &self,
        package_name: String,
        title: Option<String>,
        text: Option<String>,
        big_text: Option<String>,
        text_lines: Option<Vec<String>>,
    ) {
        self.enqueue(PlatformEvent::Posted { package_name, title, text, big_text, text_lines });
    }

    /// A notification of `package_name` was dismissed or cleared. Returns immediately.
    pub fn on_removed(&self, package_name: String) {
        self.enqueue(PlatformEvent::Removed { package_name });
    }

    /// Enqueue any platform event. Returns immediately.
    pub fn submit(&self, event: PlatformEvent) {
        self.enqueue(event);
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Subscribers
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn subscribe(&self, subscriber: Arc<dyn NotificationEventSubscriber>) -> u64 {
        self.bus.subscribe(subscriber)
    }

    pub fn unsubscribe(&self, subscription_id: u64) -> bool {
        self.bus.unsubscribe(subscription_id)
    }

    pub fn subscriber_count(&self) -> u64 {
        self.bus.len() as u64
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────────

    /// Resolves once every event enqueued before this call has been written
    /// and published.
    pub async fn flush(&self) -> Result<(), TiddyError> {
        let (ack, done) = oneshot::channel();
        self.sender
            .send(Command::Flush(ack))
            .map_err(|_| TiddyError::ListenerStopped)?;
        done.await.map_err(|_| TiddyError::ListenerStopped)
    }

    /// Stop the worker. Events still queued are discarded; call `flush` first
    /// to drain them.
    pub fn stop(&self) {
        if !self.token.is_cancelled() {
            info!("Stopping ingestion listener");
        }
        self.token.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled() && !self.sender.is_closed()
    }
}

/// Owns everything the background task touches
struct Worker {
    store: Arc<dyn NotificationStoreApi>,
    resolver: Arc<dyn AppLabelResolver>,
    bus: Arc<EventBus>,
}

impl Worker {
    async fn run(self, mut receiver: mpsc::UnboundedReceiver<Command>, token: CancellationToken) {
        loop {
            let command = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                command = receiver.recv() => match command {
                    Some(command) => command,
                    None => break,
                },
            };

            match command {
                Command::Event { event, received_at } => self.handle(event, received_at).await,
                Command::Flush(ack) => {
                    let _ = ack.send(());
                }
            }
        }
        debug!("Ingestion worker exited");
    }

    async fn handle(&self, event: PlatformEvent, received_at: i64) {
        match event {
            PlatformEvent::Posted { .. } => {
                let store = Arc::clone(&self.store);
                let resolver = Arc::clone(&self.resolver);

                // Label lookup is a foreign call and the insert hits SQLite:
                // both stay off the async worker thread.
                let outcome = tokio::task::spawn_blocking(move || {
                    let app_name = resolve_app_name(resolver.as_ref(), event.package_name());
                    let mut record = NotificationRecord::from_event(&event, app_name, received_at)?;
                    match store.insert(record.clone()) {
                        Ok(id) => record.id = id,
                        Err(e) => warn!(
                            package = %record.package_name,
                            error = %e,
                            "Failed to persist posted notification"
                        ),
                    }
                    Some(record)
                })
                .await;

                match outcome {
                    Ok(Some(record)) => {
                        debug!(id = record.id, package = %record.package_name, "Notification posted");
                        self.bus.publish(&NotificationEvent::Posted { record });
                    }
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "Posted notification task failed"),
                }
            }
            PlatformEvent::Removed { package_name } => {
                let store = Arc::clone(&self.store);
                let package = package_name.clone();
                match tokio::task::spawn_blocking(move || store.mark_removed(package)).await {
                    Ok(Ok(changed)) => {
                        debug!(package = %package_name, changed, "Notification removed")
                    }
                    Ok(Err(e)) => warn!(
                        package = %package_name,
                        error = %e,
                        "Failed to mark notifications removed"
                    ),
                    Err(e) => warn!(error = %e, "Removed notification task failed"),
                }
                self.bus.publish(&NotificationEvent::Removed { package_name });
            }
        }
    }
}

/// Label for a package, falling back to the package identifier when the
/// lookup has nothing usable.
fn resolve_app_name(resolver: &dyn AppLabelResolver, package_name: &str) -> String {
    match resolver.resolve_label(package_name.to_string()) {
        Some(label) if !label.trim().is_empty() => label,
        _ => {
            debug!(package = %package_name, "No label for package, using identifier");
            package_name.to_string()
        }
    }
}
