// Rust guideline compliant 2026-10-16

//! Fraud-screening pipeline entry point.
//!
//! Wires the rule engine, the notification dispatcher and the ingestion loop
//! to the in-memory queue and log topic adapters, with a feeder producing
//! synthetic transactions onto the queue.
//!
//! # Usage
//!
//! ```text
//! # Runs until CTRL+C; the current cycle finishes before exit
//! RUST_LOG=info cargo run
//!
//! # Tighter rules and faster polling
//! FRAUD_RULE_AMOUNT_THRESHOLD=5000 FRAUD_RULE_RISK_LOCATIONS=Lagos,Minsk \
//!     QUEUE_POLLING_RATE_MS=1000 cargo run
//! ```

mod adapters;
mod config;

use std::time::Duration;

use adapters::in_memory_queue::InMemoryQueue;
use adapters::log_topic::LogTopic;
use anyhow::Context as _;
use config::AppConfig;
use feeder::{Feeder, FeederConfig};
use ingestion::IngestionLoop;
use notifier::NotificationDispatcher;
use rule_engine::RuleEngine;
use tracing::Instrument as _;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env().context("failed to read configuration")?;
    tracing::info!(queue_url = %config.queue_url, topic = %config.alert_topic, "main.config.loaded");

    let engine = RuleEngine::new(config.rule_config().context("failed to build rule config")?);
    let ingestion = IngestionLoop::new(
        config
            .ingestion_config()
            .context("failed to build ingestion config")?,
    );
    let dispatcher = NotificationDispatcher::new(LogTopic::new(), config.alert_topic.as_str());
    let queue = InMemoryQueue::new(config.queue_url.as_str(), config.visibility_timeout);

    // Up to 20 transactions every 2 s; about 2% of them malformed.
    let feeder = Feeder::new(
        FeederConfig::builder(20)
            .interval(Duration::from_secs(2))
            .build()
            .context("failed to build feeder config")?,
    );

    // Shutdown stops the ingestion loop between cycles; closing the queue
    // afterwards makes the feeder's next send fail with Closed, ending it too.
    let (fed, cycles) = tokio::join!(
        async {
            let result = feeder.run(&queue).await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "main.feeder.failed");
            }
            result
        }
        .instrument(tracing::info_span!("feeder")),
        async {
            let cycles = ingestion.run(&queue, &engine, &dispatcher, shutdown_signal()).await;
            queue.close();
            cycles
        }
        .instrument(tracing::info_span!("ingestion")),
    );

    let (ready, in_flight) = queue.depth();
    tracing::info!(
        cycles,
        alerts = dispatcher.transport().published(),
        ready,
        in_flight,
        "main.shutdown.complete"
    );
    fed.context("feeder failed")?;
    Ok(())
}

/// Resolves on CTRL+C. Never resolves if the signal handler cannot be installed.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("main.shutdown: ctrl_c received, finishing current cycle"),
        Err(e) => {
            tracing::error!(error = %e, "main.shutdown: cannot listen for ctrl_c");
            std::future::pending::<()>().await;
        }
    }
}
