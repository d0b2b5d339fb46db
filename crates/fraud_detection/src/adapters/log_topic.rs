// Rust guideline compliant 2026-10-16

//! Demo adapter for the `NotificationTransport` port.
//!
//! Logs each alert via `tracing::warn!` and always returns `Ok(())`.

use std::cell::Cell;

use domain::{NotificationTransport, NotifyError};

/// `NotificationTransport` adapter that emits a warning log per published alert.
#[derive(Debug, Default)]
pub struct LogTopic {
    published: Cell<u64>,
}

impl LogTopic {
    /// Create a log topic with no alerts published.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of alerts published so far.
    #[must_use]
    pub fn published(&self) -> u64 {
        self.published.get()
    }
}

impl NotificationTransport for LogTopic {
    async fn publish(&self, topic: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        self.published.set(self.published.get() + 1);
        tracing::warn!(topic, subject, body, "log_topic.alert");
        Ok(())
    }
}
