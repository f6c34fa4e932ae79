//! User-visible failure reporting.
//!
//! The engine reports failures through a sink it does not render;
//! the host application decides how notifications reach the user.

use std::sync::Mutex;

use crate::models::Severity;

/// Receives user-visible failure reports from the engine.
pub trait NotificationSink {
    fn notify(&self, message: &str, severity: Severity);
}

/// Default sink: routes notifications into the tracing stream.
#[derive(Debug, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info => tracing::info!(notification = %message),
            Severity::Warning => tracing::warn!(notification = %message),
            Severity::Error => tracing::error!(notification = %message),
        }
    }
}

/// Collecting sink for tests: records every notification.
#[derive(Debug, Default)]
pub struct CollectingSink {
    notifications: Mutex<Vec<(String, Severity)>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<(String, Severity)> {
        self.notifications.lock().unwrap().clone()
    }
}

impl NotificationSink for CollectingSink {
    fn notify(&self, message: &str, severity: Severity) {
        self.notifications
            .lock()
            .unwrap()
            .push((message.to_string(), severity));
    }
}
