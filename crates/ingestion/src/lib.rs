// Rust guideline compliant 2026-10-16

//! Ingestion component -- polls the transaction queue, decodes and evaluates
//! each message, acknowledges it, and dispatches alerts for fraudulent ones.
//!
//! Entry points: [`IngestionLoop::poll_once`], [`IngestionLoop::run`],
//! [`process_message`]. Configuration via [`IngestionConfig::builder`].
//!
//! Per message: `received -> decoded -> evaluated -> acknowledged ->
//! (notified | not notified)`. A decode failure stops at `received` and an
//! acknowledgment failure stops at `evaluated`; both leave the message to the
//! queue's own redelivery.

use std::cell::Cell;
use std::future::Future;
use std::time::Duration;

use domain::{
    DecodeError, DispatchStatus, Dispatcher, Evaluator, QueueError, QueueMessage, QueueTransport,
    Transaction,
};
use tokio::time::MissedTickBehavior;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that abort a whole polling cycle (or prevent one from starting).
#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    /// The supplied configuration is invalid.
    #[error("invalid ingestion configuration: {reason}")]
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// The batch receive call failed; nothing was processed this cycle.
    #[error("queue receive error: {0}")]
    Receive(QueueError),
    /// Another cycle is still running on this loop.
    #[error("a polling cycle is already in progress")]
    CycleInProgress,
}

/// Per-message failure. Never aborts the rest of the batch.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// The payload could not be decoded; the message stays on the queue.
    #[error("message {message_id}: decode failed: {source}")]
    Decode {
        /// Transport identifier of the message.
        message_id: String,
        /// Underlying decode error.
        source: DecodeError,
    },
    /// The message was evaluated but could not be acknowledged.
    #[error("message {message_id}: acknowledge failed: {source}")]
    Acknowledge {
        /// Transport identifier of the message.
        message_id: String,
        /// Underlying queue error.
        source: QueueError,
    },
}

impl MessageError {
    /// Transport identifier of the failed message.
    #[must_use]
    pub fn message_id(&self) -> &str {
        match self {
            Self::Decode { message_id, .. } | Self::Acknowledge { message_id, .. } => message_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// A message that was decoded, evaluated, and acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Processed {
    /// Id of the decoded transaction.
    pub transaction_id: String,
    /// Verdict flag.
    pub fraudulent: bool,
    /// Alert outcome; `Skipped` when the verdict was clean.
    pub dispatch: DispatchStatus,
}

/// Counters for one polling cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Messages returned by the receive call.
    pub received: usize,
    /// Messages acknowledged (deleted) from the queue.
    pub acknowledged: usize,
    /// Messages left on the queue because their payload did not decode.
    pub decode_failed: usize,
    /// Messages evaluated but not acknowledged.
    pub ack_failed: usize,
    /// Acknowledged messages with a fraudulent verdict.
    pub flagged: usize,
    /// Alerts accepted by the notification transport.
    pub notified: usize,
    /// Alerts the transport rejected.
    pub notify_failed: usize,
}

impl CycleReport {
    fn record(&mut self, outcome: &Result<Processed, MessageError>) {
        match outcome {
            Ok(processed) => {
                self.acknowledged += 1;
                if processed.fraudulent {
                    self.flagged += 1;
                }
                match processed.dispatch {
                    DispatchStatus::Sent => self.notified += 1,
                    DispatchStatus::Failed => self.notify_failed += 1,
                    DispatchStatus::Skipped => {}
                }
            }
            Err(MessageError::Decode { .. }) => self.decode_failed += 1,
            Err(MessageError::Acknowledge { .. }) => self.ack_failed += 1,
        }
    }
}

// ---------------------------------------------------------------------------
// IngestionConfig + builder
// ---------------------------------------------------------------------------

/// Runtime configuration for an [`IngestionLoop`].
///
/// Construct via [`IngestionConfig::builder`].
#[derive(Debug)]
pub struct IngestionConfig {
    /// Maximum number of messages requested per poll.
    pub max_messages: usize,
    /// Long-poll wait window for each receive call.
    pub wait_time: Duration,
    /// Interval between cycle starts.
    pub poll_interval: Duration,
    /// Optional upper bound on the number of cycles. `None` means infinite.
    pub iterations: Option<u64>,
}

/// Builder for [`IngestionConfig`].
///
/// Obtain via [`IngestionConfig::builder`]; finalize with [`build`](Self::build).
#[derive(Debug)]
pub struct IngestionConfigBuilder {
    max_messages: usize,
    wait_time: Duration,
    poll_interval: Duration,
    iterations: Option<u64>,
}

impl IngestionConfig {
    /// Create a builder. `max_messages` is the only required parameter.
    ///
    /// Default values: `wait_time = 20 s`, `poll_interval = 5 s`, `iterations = None`.
    #[must_use]
    pub fn builder(max_messages: usize) -> IngestionConfigBuilder {
        IngestionConfigBuilder {
            max_messages,
            wait_time: Duration::from_secs(20),
            poll_interval: Duration::from_secs(5),
            iterations: None,
        }
    }
}

impl IngestionConfigBuilder {
    /// Override the long-poll wait window.
    #[must_use]
    pub fn wait_time(mut self, wait_time: Duration) -> Self {
        self.wait_time = wait_time;
        self
    }

    /// Override the interval between cycle starts.
    #[must_use]
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set a finite cycle count. Without this the loop runs until shutdown.
    #[must_use]
    pub fn iterations(mut self, n: u64) -> Self {
        self.iterations = Some(n);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`IngestionError::InvalidConfig`] when `max_messages`,
    /// `wait_time`, or `poll_interval` is zero.
    #[must_use = "the Result must be checked; use ? or unwrap"]
    pub fn build(self) -> Result<IngestionConfig, IngestionError> {
        let invalid = |reason: &str| IngestionError::InvalidConfig { reason: reason.to_owned() };
        if self.max_messages == 0 {
            return Err(invalid("max_messages must be >= 1"));
        }
        if self.wait_time.is_zero() {
            return Err(invalid("wait_time must be non-zero"));
        }
        if self.poll_interval.is_zero() {
            return Err(invalid("poll_interval must be non-zero"));
        }
        Ok(IngestionConfig {
            max_messages: self.max_messages,
            wait_time: self.wait_time,
            poll_interval: self.poll_interval,
            iterations: self.iterations,
        })
    }
}

// ---------------------------------------------------------------------------
// Per-message processing
// ---------------------------------------------------------------------------

/// Decode, evaluate, acknowledge, then dispatch one message.
///
/// Acknowledgment always precedes dispatch, and dispatch only happens for a
/// fraudulent verdict whose message was acknowledged.
///
/// # Errors
///
/// Returns [`MessageError::Decode`] without touching the queue when the payload
/// does not decode, or [`MessageError::Acknowledge`] without dispatching when
/// the acknowledgment fails.
pub async fn process_message<Q, E, D>(
    message: &QueueMessage,
    queue: &Q,
    evaluator: &E,
    dispatcher: &D,
) -> Result<Processed, MessageError>
where
    Q: QueueTransport,
    E: Evaluator,
    D: Dispatcher,
{
    let transaction = Transaction::from_payload(&message.payload).map_err(|source| {
        MessageError::Decode { message_id: message.id.clone(), source }
    })?;
    tracing::debug!(
        message_id = %message.id,
        transaction_id = %transaction.transaction_id,
        account_id = %transaction.account_id,
        amount = %transaction.amount,
        "ingestion.message.decoded"
    );

    let verdict = evaluator.evaluate(&transaction);

    queue.acknowledge(&message.ack_handle).await.map_err(|source| {
        MessageError::Acknowledge { message_id: message.id.clone(), source }
    })?;

    let dispatch = if verdict.is_fraudulent {
        dispatcher.dispatch(&verdict).await
    } else {
        DispatchStatus::Skipped
    };

    Ok(Processed {
        transaction_id: verdict.transaction_id,
        fraudulent: verdict.is_fraudulent,
        dispatch,
    })
}

// ---------------------------------------------------------------------------
// IngestionLoop
// ---------------------------------------------------------------------------

/// Clears the in-flight flag when a cycle ends, including when its future is dropped.
struct CycleGuard<'a>(&'a Cell<bool>);

impl<'a> CycleGuard<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            return None;
        }
        Some(Self(flag))
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Polls the queue on a fixed interval and runs every message through the
/// decode, evaluate, acknowledge, dispatch sequence.
///
/// Generic over all three hexagonal ports for zero-cost static dispatch.
/// Holds no concrete adapter references -- dependencies are injected per call.
#[derive(Debug)]
pub struct IngestionLoop {
    config: IngestionConfig,
    /// Set while a cycle runs; interior mutability because methods take `&self`.
    in_flight: Cell<bool>,
}

impl IngestionLoop {
    /// Create a new loop from `config`.
    #[must_use]
    pub fn new(config: IngestionConfig) -> Self {
        Self { config, in_flight: Cell::new(false) }
    }

    /// Run one polling cycle.
    ///
    /// Receives up to `max_messages` and processes each independently;
    /// per-message failures are logged and counted, never propagated.
    ///
    /// # Errors
    ///
    /// Returns [`IngestionError::Receive`] when the receive call fails (no
    /// message is touched), or [`IngestionError::CycleInProgress`] when
    /// another cycle on this loop has not finished.
    pub async fn poll_once<Q, E, D>(
        &self,
        queue: &Q,
        evaluator: &E,
        dispatcher: &D,
    ) -> Result<CycleReport, IngestionError>
    where
        Q: QueueTransport,
        E: Evaluator,
        D: Dispatcher,
    {
        let _guard = CycleGuard::acquire(&self.in_flight).ok_or(IngestionError::CycleInProgress)?;

        let messages = queue
            .receive_batch(self.config.max_messages, self.config.wait_time)
            .await
            .map_err(IngestionError::Receive)?;

        let mut report = CycleReport { received: messages.len(), ..CycleReport::default() };
        if messages.is_empty() {
            tracing::trace!("ingestion.cycle.empty");
            return Ok(report);
        }
        tracing::info!(count = messages.len(), "ingestion.cycle.received");

        for message in &messages {
            let outcome = process_message(message, queue, evaluator, dispatcher).await;
            match &outcome {
                Ok(processed) => tracing::debug!(
                    message_id = %message.id,
                    transaction_id = %processed.transaction_id,
                    fraudulent = processed.fraudulent,
                    "ingestion.message.processed"
                ),
                Err(e) => tracing::error!(
                    message_id = %e.message_id(),
                    error = %e,
                    "ingestion.message.failed: left on queue for redelivery"
                ),
            }
            report.record(&outcome);
        }

        tracing::info!(
            acknowledged = report.acknowledged,
            decode_failed = report.decode_failed,
            ack_failed = report.ack_failed,
            flagged = report.flagged,
            notified = report.notified,
            "ingestion.cycle.completed"
        );
        Ok(report)
    }

    /// Run polling cycles until `shutdown` resolves.
    ///
    /// Cycles start every `poll_interval`; a cycle that overruns delays the
    /// next one instead of overlapping it. `shutdown` is only observed between
    /// cycles, so an in-progress cycle always finishes its messages. Stops
    /// early once `config.iterations` cycles have run.
    ///
    /// Cycle failures are logged and never end the loop. Returns the number of
    /// cycles run.
    pub async fn run<Q, E, D, S>(&self, queue: &Q, evaluator: &E, dispatcher: &D, shutdown: S) -> u64
    where
        Q: QueueTransport,
        E: Evaluator,
        D: Dispatcher,
        S: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut count = 0u64;
        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    tracing::info!(cycles = count, "ingestion.run.stopped: shutdown requested");
                    return count;
                }
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.poll_once(queue, evaluator, dispatcher).await {
                tracing::error!(error = %e, "ingestion.cycle.failed");
            }

            count += 1;
            if let Some(max) = self.config.iterations
                && count >= max
            {
                tracing::info!(cycles = count, "ingestion.run.stopped: iteration limit reached");
                return count;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::Verdict;
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::rc::Rc;

    type Journal = Rc<RefCell<Vec<String>>>;

    // ------------------------------------------------------------------
    // Test helpers
    // ------------------------------------------------------------------

    fn payload(id: &str, account_id: &str) -> String {
        format!(
            r#"{{"transactionId":"{id}","accountId":"{account_id}","amount":100.0,
                "location":"Paris","merchantId":"MCH-1","transactionTime":"2026-10-16T10:00:00Z"}}"#
        )
    }

    fn message(n: u32, payload: String) -> QueueMessage {
        QueueMessage::new(format!("MSG-{n}"), payload, format!("RECEIPT-{n}"))
    }

    fn make_loop() -> IngestionLoop {
        IngestionLoop::new(
            IngestionConfig::builder(10)
                .wait_time(Duration::from_secs(1))
                .poll_interval(Duration::from_millis(1))
                .build()
                .unwrap(),
        )
    }

    // ------------------------------------------------------------------
    // Mock adapters
    // ------------------------------------------------------------------

    struct MockQueue {
        batch: RefCell<Vec<QueueMessage>>,
        fail_receive: bool,
        fail_ack: HashSet<String>,
        receive_calls: Cell<u32>,
        last_request: Cell<Option<(usize, Duration)>>,
        acked: RefCell<Vec<String>>,
        journal: Journal,
    }

    impl MockQueue {
        fn new(batch: Vec<QueueMessage>, journal: &Journal) -> Self {
            Self {
                batch: RefCell::new(batch),
                fail_receive: false,
                fail_ack: HashSet::new(),
                receive_calls: Cell::new(0),
                last_request: Cell::new(None),
                acked: RefCell::new(vec![]),
                journal: Rc::clone(journal),
            }
        }

        fn failing_receive(journal: &Journal) -> Self {
            Self { fail_receive: true, ..Self::new(vec![], journal) }
        }

        fn failing_ack_for(batch: Vec<QueueMessage>, handle: &str, journal: &Journal) -> Self {
            Self { fail_ack: HashSet::from([handle.to_owned()]), ..Self::new(batch, journal) }
        }
    }

    impl QueueTransport for MockQueue {
        async fn receive_batch(
            &self,
            max: usize,
            wait: Duration,
        ) -> Result<Vec<QueueMessage>, QueueError> {
            self.receive_calls.set(self.receive_calls.get() + 1);
            self.last_request.set(Some((max, wait)));
            if self.fail_receive {
                return Err(QueueError::ReceiveFailed { reason: "access denied".to_owned() });
            }
            Ok(self.batch.borrow_mut().drain(..).collect())
        }

        async fn acknowledge(&self, ack_handle: &str) -> Result<(), QueueError> {
            if self.fail_ack.contains(ack_handle) {
                return Err(QueueError::AcknowledgeFailed {
                    ack_handle: ack_handle.to_owned(),
                    reason: "mock failure".to_owned(),
                });
            }
            self.acked.borrow_mut().push(ack_handle.to_owned());
            self.journal.borrow_mut().push(format!("ack:{ack_handle}"));
            Ok(())
        }
    }

    /// Flags every transaction whose account id starts with `FRAUD`.
    struct MockEvaluator {
        calls: Cell<u32>,
    }

    impl MockEvaluator {
        fn new() -> Self {
            Self { calls: Cell::new(0) }
        }
    }

    impl Evaluator for MockEvaluator {
        fn evaluate(&self, transaction: &Transaction) -> Verdict {
            self.calls.set(self.calls.get() + 1);
            let reasons = if transaction.account_id.starts_with("FRAUD") {
                vec!["flagged by mock".to_owned()]
            } else {
                vec![]
            };
            Verdict::from_reasons(transaction.transaction_id.clone(), reasons, Utc::now())
        }
    }

    struct MockDispatcher {
        dispatched: RefCell<Vec<String>>,
        status: DispatchStatus,
        journal: Journal,
    }

    impl MockDispatcher {
        fn new(journal: &Journal) -> Self {
            Self { dispatched: RefCell::new(vec![]), status: DispatchStatus::Sent, journal: Rc::clone(journal) }
        }

        fn failing(journal: &Journal) -> Self {
            Self { status: DispatchStatus::Failed, ..Self::new(journal) }
        }
    }

    impl Dispatcher for MockDispatcher {
        async fn dispatch(&self, verdict: &Verdict) -> DispatchStatus {
            self.dispatched.borrow_mut().push(verdict.transaction_id.clone());
            self.journal.borrow_mut().push(format!("notify:{}", verdict.transaction_id));
            self.status
        }
    }

    // ------------------------------------------------------------------
    // IngestionConfig validation
    // ------------------------------------------------------------------

    #[test]
    fn config_rejects_zero_max_messages() {
        let result = IngestionConfig::builder(0).build();
        assert!(matches!(result, Err(IngestionError::InvalidConfig { .. })));
    }

    #[test]
    fn config_rejects_zero_wait_time() {
        let result = IngestionConfig::builder(10).wait_time(Duration::ZERO).build();
        assert!(matches!(result, Err(IngestionError::InvalidConfig { .. })));
    }

    #[test]
    fn config_rejects_zero_poll_interval() {
        let result = IngestionConfig::builder(10).poll_interval(Duration::ZERO).build();
        assert!(matches!(result, Err(IngestionError::InvalidConfig { .. })));
    }

    #[test]
    fn builder_defaults() {
        let config = IngestionConfig::builder(10).build().unwrap();
        assert_eq!(config.wait_time, Duration::from_secs(20));
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert!(config.iterations.is_none());
    }

    // ------------------------------------------------------------------
    // poll_once
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn empty_queue_is_a_no_op() {
        let journal = Journal::default();
        let queue = MockQueue::new(vec![], &journal);
        let evaluator = MockEvaluator::new();
        let dispatcher = MockDispatcher::new(&journal);

        let report = make_loop().poll_once(&queue, &evaluator, &dispatcher).await.unwrap();

        assert_eq!(report, CycleReport::default());
        assert_eq!(queue.receive_calls.get(), 1);
        assert_eq!(queue.last_request.get(), Some((10, Duration::from_secs(1))));
        assert_eq!(evaluator.calls.get(), 0);
        assert!(queue.acked.borrow().is_empty());
        assert!(dispatcher.dispatched.borrow().is_empty());
    }

    #[tokio::test]
    async fn fraudulent_message_is_acknowledged_then_notified() {
        let journal = Journal::default();
        let queue = MockQueue::new(vec![message(1, payload("TX-1", "FRAUD-1"))], &journal);
        let evaluator = MockEvaluator::new();
        let dispatcher = MockDispatcher::new(&journal);

        let report = make_loop().poll_once(&queue, &evaluator, &dispatcher).await.unwrap();

        assert_eq!(*queue.acked.borrow(), vec!["RECEIPT-1"]);
        assert_eq!(*dispatcher.dispatched.borrow(), vec!["TX-1"]);
        assert_eq!(*journal.borrow(), vec!["ack:RECEIPT-1", "notify:TX-1"], "ack must precede notify");
        assert_eq!(report.received, 1);
        assert_eq!(report.acknowledged, 1);
        assert_eq!(report.flagged, 1);
        assert_eq!(report.notified, 1);
    }

    #[tokio::test]
    async fn clean_message_is_acknowledged_without_notification() {
        let journal = Journal::default();
        let queue = MockQueue::new(vec![message(1, payload("TX-1", "ACCT-1"))], &journal);
        let evaluator = MockEvaluator::new();
        let dispatcher = MockDispatcher::new(&journal);

        let report = make_loop().poll_once(&queue, &evaluator, &dispatcher).await.unwrap();

        assert_eq!(*queue.acked.borrow(), vec!["RECEIPT-1"]);
        assert!(dispatcher.dispatched.borrow().is_empty());
        assert_eq!(report.acknowledged, 1);
        assert_eq!(report.flagged, 0);
    }

    #[tokio::test]
    async fn malformed_message_does_not_block_the_batch() {
        let journal = Journal::default();
        let queue = MockQueue::new(
            vec![message(1, "invalid-json".to_owned()), message(2, payload("TX-2", "FRAUD-2"))],
            &journal,
        );
        let evaluator = MockEvaluator::new();
        let dispatcher = MockDispatcher::new(&journal);

        let report = make_loop().poll_once(&queue, &evaluator, &dispatcher).await.unwrap();

        assert_eq!(*queue.acked.borrow(), vec!["RECEIPT-2"], "malformed message must stay on the queue");
        assert_eq!(*dispatcher.dispatched.borrow(), vec!["TX-2"]);
        assert_eq!(evaluator.calls.get(), 1, "malformed message must not be evaluated");
        assert_eq!(report.decode_failed, 1);
        assert_eq!(report.acknowledged, 1);
    }

    #[tokio::test]
    async fn receive_failure_touches_nothing_downstream() {
        let journal = Journal::default();
        let queue = MockQueue::failing_receive(&journal);
        let evaluator = MockEvaluator::new();
        let dispatcher = MockDispatcher::new(&journal);

        let result = make_loop().poll_once(&queue, &evaluator, &dispatcher).await;

        assert!(matches!(result, Err(IngestionError::Receive(QueueError::ReceiveFailed { .. }))));
        assert_eq!(evaluator.calls.get(), 0);
        assert!(journal.borrow().is_empty());
    }

    #[tokio::test]
    async fn ack_failure_skips_notification_and_continues() {
        let journal = Journal::default();
        let queue = MockQueue::failing_ack_for(
            vec![message(1, payload("TX-1", "FRAUD-1")), message(2, payload("TX-2", "FRAUD-2"))],
            "RECEIPT-1",
            &journal,
        );
        let evaluator = MockEvaluator::new();
        let dispatcher = MockDispatcher::new(&journal);

        let report = make_loop().poll_once(&queue, &evaluator, &dispatcher).await.unwrap();

        assert_eq!(*dispatcher.dispatched.borrow(), vec!["TX-2"], "unacknowledged message must not notify");
        assert_eq!(report.ack_failed, 1);
        assert_eq!(report.acknowledged, 1);
        assert_eq!(report.notified, 1);
    }

    #[tokio::test]
    async fn dispatch_failure_keeps_acknowledgment() {
        let journal = Journal::default();
        let queue = MockQueue::new(vec![message(1, payload("TX-1", "FRAUD-1"))], &journal);
        let evaluator = MockEvaluator::new();
        let dispatcher = MockDispatcher::failing(&journal);

        let report = make_loop().poll_once(&queue, &evaluator, &dispatcher).await.unwrap();

        assert_eq!(*queue.acked.borrow(), vec!["RECEIPT-1"]);
        assert_eq!(report.notify_failed, 1);
        assert_eq!(report.notified, 0);
    }

    #[tokio::test]
    async fn each_message_is_acknowledged_with_its_own_handle() {
        let journal = Journal::default();
        let batch = (1..=4).map(|n| message(n, payload(&format!("TX-{n}"), "ACCT"))).collect();
        let queue = MockQueue::new(batch, &journal);
        let evaluator = MockEvaluator::new();
        let dispatcher = MockDispatcher::new(&journal);

        make_loop().poll_once(&queue, &evaluator, &dispatcher).await.unwrap();

        assert_eq!(*queue.acked.borrow(), vec!["RECEIPT-1", "RECEIPT-2", "RECEIPT-3", "RECEIPT-4"]);
    }

    #[tokio::test]
    async fn overlapping_cycle_is_refused() {
        let journal = Journal::default();
        let queue = MockQueue::new(vec![], &journal);
        let evaluator = MockEvaluator::new();
        let dispatcher = MockDispatcher::new(&journal);
        let ingestion = make_loop();

        ingestion.in_flight.set(true);
        let result = ingestion.poll_once(&queue, &evaluator, &dispatcher).await;
        assert!(matches!(result, Err(IngestionError::CycleInProgress)));
        assert_eq!(queue.receive_calls.get(), 0);

        ingestion.in_flight.set(false);
        ingestion.poll_once(&queue, &evaluator, &dispatcher).await.unwrap();
        assert!(!ingestion.in_flight.get(), "guard must be released after the cycle");
    }

    // ------------------------------------------------------------------
    // process_message
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn decode_error_carries_message_id() {
        let journal = Journal::default();
        let queue = MockQueue::new(vec![], &journal);
        let evaluator = MockEvaluator::new();
        let dispatcher = MockDispatcher::new(&journal);

        let result =
            process_message(&message(7, "{".to_owned()), &queue, &evaluator, &dispatcher).await;

        let err = result.unwrap_err();
        assert!(matches!(err, MessageError::Decode { .. }));
        assert_eq!(err.message_id(), "MSG-7");
        assert!(queue.acked.borrow().is_empty());
    }

    // ------------------------------------------------------------------
    // run loop
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn run_processes_n_iterations() {
        let journal = Journal::default();
        let queue = MockQueue::new(vec![message(1, payload("TX-1", "FRAUD-1"))], &journal);
        let evaluator = MockEvaluator::new();
        let dispatcher = MockDispatcher::new(&journal);
        let ingestion = IngestionLoop::new(
            IngestionConfig::builder(5)
                .wait_time(Duration::from_millis(1))
                .poll_interval(Duration::from_millis(1))
                .iterations(3)
                .build()
                .unwrap(),
        );

        let cycles = ingestion.run(&queue, &evaluator, &dispatcher, std::future::pending()).await;

        assert_eq!(cycles, 3);
        assert_eq!(queue.receive_calls.get(), 3);
        assert_eq!(*dispatcher.dispatched.borrow(), vec!["TX-1"]);
    }

    #[tokio::test]
    async fn run_survives_receive_failures() {
        let journal = Journal::default();
        let queue = MockQueue::failing_receive(&journal);
        let evaluator = MockEvaluator::new();
        let dispatcher = MockDispatcher::new(&journal);
        let ingestion = IngestionLoop::new(
            IngestionConfig::builder(5)
                .poll_interval(Duration::from_millis(1))
                .iterations(2)
                .build()
                .unwrap(),
        );

        let cycles = ingestion.run(&queue, &evaluator, &dispatcher, std::future::pending()).await;

        assert_eq!(cycles, 2, "receive failures must not end the loop");
        assert_eq!(queue.receive_calls.get(), 2);
    }

    #[tokio::test]
    async fn run_stops_before_next_cycle_on_shutdown() {
        let journal = Journal::default();
        let queue = MockQueue::new(vec![message(1, payload("TX-1", "ACCT"))], &journal);
        let evaluator = MockEvaluator::new();
        let dispatcher = MockDispatcher::new(&journal);

        let cycles = make_loop().run(&queue, &evaluator, &dispatcher, std::future::ready(())).await;

        assert_eq!(cycles, 0);
        assert_eq!(queue.receive_calls.get(), 0);
    }
}
