// Rust guideline compliant 2026-10-16

//! Shared domain types for the fraud-screening pipeline.
//!
//! Defines `Transaction`, `Verdict`, `QueueMessage`, the error enums of every
//! port, and the hexagonal port traits: `QueueTransport`, `QueueSink`,
//! `NotificationTransport`, `Evaluator`, and `Dispatcher`.
//! All pipeline crates depend on this crate.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A single financial transaction decoded from a queue message payload.
///
/// Wire format is a JSON object with camelCase keys. Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Unique per event.
    pub transaction_id: String,
    /// Account the transaction was made from.
    pub account_id: String,
    /// Non-negative amount. Carried as a JSON number on the wire.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Free-text location; absent or `null` decodes to an empty string.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub location: String,
    /// Merchant identifier; absent or `null` decodes to an empty string.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub merchant_id: String,
    /// When the transaction happened (RFC 3339).
    pub transaction_time: DateTime<Utc>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Transaction {
    /// Decode a transaction from a raw message payload.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Malformed`] when the payload is not a valid
    /// transaction record, or [`DecodeError::NegativeAmount`] when `amount < 0`.
    pub fn from_payload(payload: &str) -> Result<Self, DecodeError> {
        let transaction: Self = serde_json::from_str(payload)?;
        if transaction.amount < Decimal::ZERO {
            return Err(DecodeError::NegativeAmount {
                transaction_id: transaction.transaction_id,
                amount: transaction.amount,
            });
        }
        Ok(transaction)
    }

    /// Encode this transaction as a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if the amount cannot be represented as a JSON number.
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// Result of evaluating one transaction against the fraud rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Copied from the evaluated transaction.
    pub transaction_id: String,
    /// `true` iff at least one rule triggered.
    pub is_fraudulent: bool,
    /// One human-readable entry per triggered rule, in rule order.
    pub reasons: Vec<String>,
    /// Set at evaluation time.
    pub detected_at: DateTime<Utc>,
}

impl Verdict {
    /// Build a verdict from the triggered reasons; fraudulent iff `reasons` is non-empty.
    #[must_use]
    pub fn from_reasons(
        transaction_id: impl Into<String>,
        reasons: Vec<String>,
        detected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            is_fraudulent: !reasons.is_empty(),
            reasons,
            detected_at,
        }
    }
}

// ---------------------------------------------------------------------------
// QueueMessage
// ---------------------------------------------------------------------------

/// One message as handed out by a [`QueueTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Transport-assigned message identifier, used in diagnostics.
    pub id: String,
    /// Raw message body.
    pub payload: String,
    /// Receipt handle for this delivery; required to acknowledge the message.
    pub ack_handle: String,
}

impl QueueMessage {
    /// Create a message.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        payload: impl Into<String>,
        ack_handle: impl Into<String>,
    ) -> Self {
        Self { id: id.into(), payload: payload.into(), ack_handle: ack_handle.into() }
    }
}

/// Outcome of a dispatch attempt. A status, not an error: dispatch never fails its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// The alert was accepted by the notification transport.
    Sent,
    /// The transport rejected the alert; logged and dropped.
    Failed,
    /// The verdict was not fraudulent; nothing was sent.
    Skipped,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from decoding a message payload into a [`Transaction`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Payload is not a well-formed transaction record.
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Payload decoded but carries a negative amount.
    #[error("negative amount {amount} in transaction {transaction_id}")]
    NegativeAmount { transaction_id: String, amount: Decimal },
}

/// Errors from the queue hexagonal ports.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// The batch receive call failed (queue unreachable, access denied, ...).
    #[error("receive failed: {reason}")]
    ReceiveFailed {
        /// Human-readable description.
        reason: String,
    },
    /// The acknowledgment (delete) call failed.
    #[error("acknowledge failed for handle {ack_handle}: {reason}")]
    AcknowledgeFailed {
        /// Receipt handle that could not be acknowledged.
        ack_handle: String,
        /// Human-readable description.
        reason: String,
    },
    /// The queue no longer accepts messages.
    #[error("queue closed")]
    Closed,
}

/// Errors from the notification transport hexagonal port.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    /// The publish call failed.
    #[error("publish to {topic} failed: {reason}")]
    PublishFailed {
        /// Topic the alert was addressed to.
        topic: String,
        /// Human-readable description.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Hexagonal port: the consuming side of the durable transaction queue.
///
/// `IngestionLoop` depends exclusively on this trait -- never on a concrete adapter.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait QueueTransport {
    /// Receive up to `max` messages, waiting at most `wait` for the first one.
    ///
    /// An empty `Vec` means the wait window elapsed with nothing to deliver.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::ReceiveFailed`] when the transport call fails.
    async fn receive_batch(
        &self,
        max: usize,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError>;

    /// Remove a delivered message from the queue so it is not redelivered.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::AcknowledgeFailed`] when the handle is unknown or
    /// the transport call fails.
    async fn acknowledge(&self, ack_handle: &str) -> Result<(), QueueError>;
}

/// Hexagonal port: the producing side of the transaction queue.
///
/// Used by the demo `Feeder`; the screening pipeline never writes to the queue.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait QueueSink {
    /// Enqueue a batch of raw payloads.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] once the queue has been shut down.
    async fn send_batch(&self, payloads: Vec<String>) -> Result<(), QueueError>;
}

/// Hexagonal port: publish-to-topic alert delivery.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait NotificationTransport {
    /// Publish one message to `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::PublishFailed`] when the transport rejects the message.
    async fn publish(&self, topic: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Hexagonal port: rule evaluation. Pure and total.
pub trait Evaluator {
    /// Evaluate one transaction and produce its verdict.
    fn evaluate(&self, transaction: &Transaction) -> Verdict;
}

/// Hexagonal port: fraud alert dispatch. Never fails its caller.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait Dispatcher {
    /// Format and send an alert for `verdict`, at most once.
    async fn dispatch(&self, verdict: &Verdict) -> DispatchStatus;
}
