// Rust guideline compliant 2026-10-16

//! Feeder component -- generates random transaction payloads and sends them
//! to a `QueueSink` hexagonal port, so the pipeline has traffic to screen
//! without an external producer.
//!
//! Entry points: [`Feeder::generate_batch`], [`Feeder::feed_once`],
//! [`Feeder::run`]. Configuration via [`FeederConfig::builder`].

use chrono::Utc;
use domain::{QueueError, QueueSink, Transaction};
use rand::{Rng, RngCore, SeedableRng, rngs::StdRng};
use rust_decimal::Decimal;
use std::cell::RefCell;
use std::time::Duration;

// ---------------------------------------------------------------------------
// FeederError
// ---------------------------------------------------------------------------

/// Errors that can occur while feeding the queue.
#[derive(Debug, thiserror::Error)]
pub enum FeederError {
    /// The supplied configuration is invalid.
    #[error("invalid feeder configuration: {reason}")]
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// A generated transaction could not be encoded.
    #[error("payload encoding error: {0}")]
    Encode(#[from] serde_json::Error),
    /// A queue send failed.
    #[error("queue error: {source}")]
    Queue {
        /// The underlying queue error.
        #[from]
        source: QueueError,
    },
}

// ---------------------------------------------------------------------------
// FeederConfig + builder
// ---------------------------------------------------------------------------

/// Runtime configuration for a [`Feeder`].
///
/// Construct via [`FeederConfig::builder`].
#[derive(Debug)]
pub struct FeederConfig {
    /// Maximum number of payloads per batch (range: `[1, batch_max]`).
    pub batch_max: usize,
    /// Delay between successive batch sends.
    pub interval: Duration,
    /// Probability that a payload is deliberately corrupted.
    pub malformed_rate: f64,
    /// Optional upper bound on the number of iterations. `None` means infinite.
    pub iterations: Option<u64>,
    /// Optional RNG seed for reproducible batches. `None` seeds from the OS.
    pub seed: Option<u64>,
}

/// Builder for [`FeederConfig`].
///
/// Obtain via [`FeederConfig::builder`]; finalize with [`build`](Self::build).
#[derive(Debug)]
pub struct FeederConfigBuilder {
    batch_max: usize,
    interval: Duration,
    malformed_rate: f64,
    iterations: Option<u64>,
    seed: Option<u64>,
}

impl FeederConfig {
    /// Create a builder. `batch_max` is the only required parameter.
    ///
    /// Default values: `interval = 1 s`, `malformed_rate = 0.02`,
    /// `iterations = None`, `seed = None`.
    #[must_use]
    pub fn builder(batch_max: usize) -> FeederConfigBuilder {
        FeederConfigBuilder {
            batch_max,
            interval: Duration::from_secs(1),
            malformed_rate: 0.02,
            iterations: None,
            seed: None,
        }
    }
}

impl FeederConfigBuilder {
    /// Override the inter-batch delay.
    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Override the share of corrupted payloads, in `[0.0, 1.0]`.
    #[must_use]
    pub fn malformed_rate(mut self, rate: f64) -> Self {
        self.malformed_rate = rate;
        self
    }

    /// Set a finite iteration count. Without this the feeder runs until the
    /// queue signals `Closed`.
    #[must_use]
    pub fn iterations(mut self, n: u64) -> Self {
        self.iterations = Some(n);
        self
    }

    /// Fix the RNG seed for deterministic output (useful in tests).
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FeederError::InvalidConfig`] when `batch_max` is zero or
    /// `malformed_rate` is outside `[0.0, 1.0]`.
    #[must_use = "the Result must be checked; use ? or unwrap"]
    pub fn build(self) -> Result<FeederConfig, FeederError> {
        if self.batch_max == 0 {
            return Err(FeederError::InvalidConfig {
                reason: "batch_max must be >= 1".to_owned(),
            });
        }
        if !(0.0..=1.0).contains(&self.malformed_rate) {
            return Err(FeederError::InvalidConfig {
                reason: format!("malformed_rate must be in [0, 1], got {}", self.malformed_rate),
            });
        }
        Ok(FeederConfig {
            batch_max: self.batch_max,
            interval: self.interval,
            malformed_rate: self.malformed_rate,
            iterations: self.iterations,
            seed: self.seed,
        })
    }
}

// ---------------------------------------------------------------------------
// Feeder
// ---------------------------------------------------------------------------

/// Account pool; includes ids commonly configured as suspicious.
const ACCOUNTS: &[&str] = &[
    "ACCT-100", "ACCT-123", "ACCT-200", "ACCT-311", "ACCT-456", "ACCT-512", "ACCT-789", "ACCT-901",
];

/// Location pool; includes high-risk names and a blank entry.
const LOCATIONS: &[&str] = &[
    "New York", "London", "Paris", "Tokyo", "Berlin", "HighRiskCountry1", "SuspiciousRegion", "",
    "Madrid", "Sydney",
];

/// Generates random transaction payloads and sends them to a [`QueueSink`].
///
/// Generic over `S: QueueSink` for zero-cost static dispatch. Holds no
/// concrete queue reference -- dependency is injected per call.
#[derive(Debug)]
pub struct Feeder {
    config: FeederConfig,
    /// Interior mutability required because all public methods take `&self`.
    rng: RefCell<StdRng>,
}

impl Feeder {
    /// Create a new feeder from `config`.
    ///
    /// Seeds the RNG from `config.seed` if set, otherwise from the OS.
    #[must_use]
    pub fn new(config: FeederConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { config, rng: RefCell::new(rng) }
    }

    /// Generate one batch of JSON payloads.
    ///
    /// Batch size is uniformly distributed in `[1, config.batch_max]`. Amounts
    /// fall in `[0.01, 20_000.00]`. Each payload is truncated to invalid JSON
    /// with probability `config.malformed_rate`.
    ///
    /// # Errors
    ///
    /// Returns [`FeederError::Encode`] if a transaction cannot be encoded.
    pub fn generate_batch(&self) -> Result<Vec<String>, FeederError> {
        let mut rng = self.rng.borrow_mut();
        let size = rng.random_range(1..=self.config.batch_max);
        let mut batch = Vec::with_capacity(size);
        for _ in 0..size {
            let mut bytes = [0u8; 16];
            rng.fill_bytes(&mut bytes);
            let id = uuid::Builder::from_random_bytes(bytes).into_uuid();

            // Integer cents keep amounts exact.
            let amount = Decimal::new(rng.random_range(1i64..=2_000_000i64), 2);

            let transaction = Transaction {
                transaction_id: format!("TX-{id}"),
                account_id: ACCOUNTS[rng.random_range(0..ACCOUNTS.len())].to_owned(),
                amount,
                location: LOCATIONS[rng.random_range(0..LOCATIONS.len())].to_owned(),
                merchant_id: format!("MCH-{:03}", rng.random_range(1..=999)),
                transaction_time: Utc::now(),
            };
            let mut payload = transaction.to_payload()?;
            if rng.random_bool(self.config.malformed_rate) {
                let keep = payload.chars().count() / 2;
                payload = payload.chars().take(keep).collect();
            }
            batch.push(payload);
        }
        Ok(batch)
    }

    /// Generate one batch and send it to `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`FeederError::Encode`] on encoding failure, or any
    /// [`QueueError`] wrapped in [`FeederError::Queue`].
    pub async fn feed_once<S: QueueSink>(&self, sink: &S) -> Result<(), FeederError> {
        let batch = self.generate_batch()?;
        tracing::debug!(size = batch.len(), "feeder.batch.generated");
        sink.send_batch(batch).await?;
        Ok(())
    }

    /// Run the feeding loop until stopped.
    ///
    /// Calls [`feed_once`](Self::feed_once) repeatedly, sleeping
    /// `config.interval` between iterations. Stops cleanly when:
    /// - the sink signals [`QueueError::Closed`] (returns `Ok(())`), or
    /// - `config.iterations` batches have been sent (returns `Ok(())`).
    ///
    /// # Errors
    ///
    /// Returns [`FeederError`] for any error other than `Closed`.
    pub async fn run<S: QueueSink>(&self, sink: &S) -> Result<(), FeederError> {
        let mut count = 0u64;
        loop {
            match self.feed_once(sink).await {
                Ok(()) => {}
                Err(FeederError::Queue { source: QueueError::Closed }) => {
                    tracing::info!(iterations = count, "feeder.run.stopped: queue closed");
                    return Ok(());
                }
                Err(e) => return Err(e),
            }

            count += 1;
            tracing::debug!(iteration = count, "feeder.batch.sent");

            if let Some(max) = self.config.iterations
                && count >= max
            {
                tracing::info!("feeder.run.stopped: iteration limit reached");
                return Ok(());
            }

            tokio::time::sleep(self.config.interval).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
