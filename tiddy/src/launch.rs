//! "Open originating app" action

use crate::interface::{AppLauncher, LaunchOutcome, NotificationRecord};
use std::sync::Arc;
use tracing::debug;

/// Ask the platform to launch the record's application and turn the answer
/// into a message for the user. A missing launch target is not an error.
#[uniffi::export]
pub fn open_originating_app(launcher: Arc<dyn AppLauncher>, record: NotificationRecord) -> LaunchOutcome {
    if launcher.launch_app(record.package_name.clone()) {
        LaunchOutcome::Opened {
            message: format!("Opening {}", record.app_name),
        }
    } else {
        debug!(package = %record.package_name, "No launch target");
        LaunchOutcome::Unavailable {
            message: format!("App {} not found or uninstalled", record.app_name),
        }
    }
}
