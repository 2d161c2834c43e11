//! NotiTiddy Core - Rust business logic for the notification history app
//!
//! This library implements the core of the NotiTiddy Android app: it ingests
//! platform notification events, persists them in SQLite, and projects them
//! into per-application summary rows with search and read tracking.
//!
//! Types are exported via UniFFI proc-macros (#[derive(uniffi::Record/Enum)]).

pub mod database;
pub mod detail;
mod events;
pub mod feed;
pub mod filter;
pub mod interface;
pub mod launch;
pub mod listener;
pub mod models;
pub mod projection;
pub mod read_state;
mod store;

pub use feed::NotificationFeed;
pub use interface::*;
pub use listener::IngestionListener;
pub use read_state::ReadStateTracker;
pub use store::NotificationStore;

uniffi::setup_scaffolding!("tiddy");
