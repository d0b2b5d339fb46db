// Rust guideline compliant 2026-10-16

//! Notifier crate: formats fraud verdicts as alerts and publishes them to a
//! topic through a `NotificationTransport` port.
//!
//! Entry point: [`NotificationDispatcher`], which implements `domain::Dispatcher`.
//! Transport failures are logged and swallowed; each verdict gets at most one
//! publish attempt.

use chrono::SecondsFormat;
use domain::{DispatchStatus, Dispatcher, NotificationTransport, Verdict};

/// Longest subject accepted by common topic services.
pub const MAX_SUBJECT_CHARS: usize = 100;

/// Alert subject for `verdict`, truncated to [`MAX_SUBJECT_CHARS`] characters.
#[must_use]
pub fn format_subject(verdict: &Verdict) -> String {
    let subject = format!("Fraud Alarm Transaction-ID: {}", verdict.transaction_id);
    if subject.chars().count() > MAX_SUBJECT_CHARS {
        subject.chars().take(MAX_SUBJECT_CHARS).collect()
    } else {
        subject
    }
}

/// Alert body: header, detection time, then one `- reason` line per reason.
#[must_use]
pub fn format_body(verdict: &Verdict) -> String {
    let mut body = format!(
        "Detect Fraud Transaction:\nTransaction-ID: {}\nDetection time: {}\nReasons:\n",
        verdict.transaction_id,
        verdict.detected_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    for reason in &verdict.reasons {
        body.push_str("- ");
        body.push_str(reason);
        body.push('\n');
    }
    body
}

// ---------------------------------------------------------------------------
// NotificationDispatcher
// ---------------------------------------------------------------------------

/// Publishes fraud alerts to a fixed topic.
///
/// Generic over `T: NotificationTransport` for zero-cost static dispatch.
#[derive(Debug)]
pub struct NotificationDispatcher<T: NotificationTransport> {
    transport: T,
    topic: String,
}

impl<T: NotificationTransport> NotificationDispatcher<T> {
    /// Create a dispatcher publishing to `topic` through `transport`.
    #[must_use]
    pub fn new(transport: T, topic: impl Into<String>) -> Self {
        Self { transport, topic: topic.into() }
    }

    /// Topic alerts are published to.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Borrow the underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: NotificationTransport> Dispatcher for NotificationDispatcher<T> {
    /// Publish one alert for a fraudulent `verdict`.
    ///
    /// Non-fraudulent verdicts are skipped. A transport failure is logged with
    /// the transaction id and reported as [`DispatchStatus::Failed`]; it is
    /// never retried.
    async fn dispatch(&self, verdict: &Verdict) -> DispatchStatus {
        if !verdict.is_fraudulent {
            tracing::debug!(transaction_id = %verdict.transaction_id, "notifier.alert.skipped");
            return DispatchStatus::Skipped;
        }

        let subject = format_subject(verdict);
        let body = format_body(verdict);
        match self.transport.publish(&self.topic, &subject, &body).await {
            Ok(()) => {
                tracing::info!(
                    transaction_id = %verdict.transaction_id,
                    topic = %self.topic,
                    "notifier.alert.sent"
                );
                DispatchStatus::Sent
            }
            Err(e) => {
                tracing::error!(
                    transaction_id = %verdict.transaction_id,
                    topic = %self.topic,
                    error = %e,
                    "notifier.alert.failed"
                );
                DispatchStatus::Failed
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
