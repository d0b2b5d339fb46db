// Rust guideline compliant 2026-10-16

//! In-process adapter for the `QueueTransport` and `QueueSink` ports.
//!
//! Behaves like a hosted message queue: receive long-polls up to the wait
//! window, received messages stay in flight under a receipt handle until
//! acknowledged, and an unacknowledged message becomes visible again once its
//! visibility timeout expires. Designed for `tokio::join!` on a
//! `current_thread` runtime.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use domain::{QueueError, QueueMessage, QueueSink, QueueTransport};
use tokio::sync::Notify;
use tokio::time::Instant;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Inner state
// ---------------------------------------------------------------------------

/// A message body with its stable id.
#[derive(Debug, Clone)]
struct Stored {
    id: String,
    payload: String,
}

/// A delivered, not yet acknowledged message.
#[derive(Debug)]
struct InFlight {
    stored: Stored,
    visible_at: Instant,
}

#[derive(Debug, Default)]
struct QueueInner {
    ready: VecDeque<Stored>,
    /// Keyed by receipt handle.
    in_flight: HashMap<String, InFlight>,
    closed: bool,
}

impl QueueInner {
    /// Move every in-flight message whose timeout has expired back to the front.
    fn requeue_expired(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .in_flight
            .iter()
            .filter(|(_, entry)| entry.visible_at <= now)
            .map(|(handle, _)| handle.clone())
            .collect();
        for handle in expired {
            if let Some(entry) = self.in_flight.remove(&handle) {
                tracing::debug!(message_id = %entry.stored.id, "in_memory_queue.message.redelivered");
                self.ready.push_front(entry.stored);
            }
        }
    }

    fn next_visible_at(&self) -> Option<Instant> {
        self.in_flight.values().map(|entry| entry.visible_at).min()
    }
}

// ---------------------------------------------------------------------------
// InMemoryQueue
// ---------------------------------------------------------------------------

/// `QueueTransport` and `QueueSink` adapter backed by process memory.
///
/// Shares a single `RefCell` across both trait impls. `RefCell` borrows are
/// always dropped before any `.await` point.
#[derive(Debug)]
pub struct InMemoryQueue {
    url: String,
    visibility_timeout: Duration,
    inner: RefCell<QueueInner>,
    arrivals: Notify,
}

impl InMemoryQueue {
    /// Create an empty, open queue identified by `url`.
    #[must_use]
    pub fn new(url: impl Into<String>, visibility_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            visibility_timeout,
            inner: RefCell::new(QueueInner::default()),
            arrivals: Notify::new(),
        }
    }

    /// Stop accepting sends. Messages already queued can still be received.
    /// Idempotent.
    pub fn close(&self) {
        self.inner.borrow_mut().closed = true;
        tracing::debug!(url = %self.url, "in_memory_queue.closed");
    }

    /// `(ready, in_flight)` message counts.
    #[must_use]
    pub fn depth(&self) -> (usize, usize) {
        let inner = self.inner.borrow();
        (inner.ready.len(), inner.in_flight.len())
    }

    /// Deliver up to `max` ready messages, marking each in flight.
    fn take_ready(&self, max: usize, now: Instant) -> Vec<QueueMessage> {
        let mut inner = self.inner.borrow_mut();
        inner.requeue_expired(now);
        let count = max.min(inner.ready.len());
        let visible_at = now + self.visibility_timeout;
        let taken: Vec<Stored> = inner.ready.drain(..count).collect();
        let mut batch = Vec::with_capacity(count);
        for stored in taken {
            let handle = Uuid::new_v4().to_string();
            batch.push(QueueMessage::new(stored.id.clone(), stored.payload.clone(), handle.clone()));
            inner.in_flight.insert(handle, InFlight { stored, visible_at });
        }
        batch
    }
}

impl QueueSink for InMemoryQueue {
    /// Append each payload as a new message and wake any waiting receiver.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] if the queue has been closed.
    async fn send_batch(&self, payloads: Vec<String>) -> Result<(), QueueError> {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.closed {
                return Err(QueueError::Closed);
            }
            inner.ready.extend(
                payloads
                    .into_iter()
                    .map(|payload| Stored { id: Uuid::new_v4().to_string(), payload }),
            );
        }
        self.arrivals.notify_waiters();
        Ok(())
    }
}

impl QueueTransport for InMemoryQueue {
    /// Receive up to `max` messages, waiting at most `wait` for the first one.
    ///
    /// Returns an empty batch when nothing became visible within `wait`.
    async fn receive_batch(&self, max: usize, wait: Duration) -> Result<Vec<QueueMessage>, QueueError> {
        let deadline = Instant::now() + wait;
        loop {
            let now = Instant::now();
            let batch = self.take_ready(max, now);
            if !batch.is_empty() || now >= deadline {
                return Ok(batch);
            }

            // Wake on a send, on the next visibility expiry, or at the deadline.
            let wake_at = self
                .inner
                .borrow()
                .next_visible_at()
                .map_or(deadline, |visible_at| visible_at.min(deadline));
            let arrival = self.arrivals.notified();
            // Timing out just means it is time to look again.
            let _ = tokio::time::timeout_at(wake_at, arrival).await;
        }
    }

    /// Delete the in-flight message identified by `ack_handle`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::AcknowledgeFailed`] when the handle is unknown,
    /// already acknowledged, or expired and redelivered.
    async fn acknowledge(&self, ack_handle: &str) -> Result<(), QueueError> {
        match self.inner.borrow_mut().in_flight.remove(ack_handle) {
            Some(_) => Ok(()),
            None => Err(QueueError::AcknowledgeFailed {
                ack_handle: ack_handle.to_owned(),
                reason: "unknown or expired receipt handle".to_owned(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
