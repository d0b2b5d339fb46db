// Rust guideline compliant 2026-10-16

//! Rule-based fraud evaluation for the screening pipeline.
//!
//! [`RuleEngine`] implements the `domain::Evaluator` port over an immutable
//! [`RuleConfig`]. Three rules are checked on every transaction, never
//! short-circuited: amount threshold, suspicious account, high-risk location.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use domain::{Evaluator, Transaction, Verdict};
use rust_decimal::{Decimal, RoundingStrategy};

// ---------------------------------------------------------------------------
// RuleConfigError
// ---------------------------------------------------------------------------

/// Errors that can occur while building a [`RuleConfig`].
#[derive(Debug, thiserror::Error)]
pub enum RuleConfigError {
    /// The supplied configuration is invalid.
    #[error("invalid rule configuration: {reason}")]
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// RuleConfig + builder
// ---------------------------------------------------------------------------

/// Fixed rule configuration, loaded once per process.
///
/// Construct via [`RuleConfig::builder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleConfig {
    /// Amounts strictly above this value trigger the amount rule.
    pub amount_threshold: Decimal,
    /// Account ids matched exactly.
    pub suspicious_accounts: HashSet<String>,
    /// Substrings matched against the transaction location.
    pub high_risk_locations: Vec<String>,
    /// Enables the high-risk location rule.
    pub unusual_location_check: bool,
}

/// Builder for [`RuleConfig`].
///
/// Obtain via [`RuleConfig::builder`]; finalize with [`build`](Self::build).
#[derive(Debug)]
pub struct RuleConfigBuilder {
    amount_threshold: Decimal,
    suspicious_accounts: HashSet<String>,
    high_risk_locations: Vec<String>,
    unusual_location_check: bool,
}

impl RuleConfig {
    /// Create a builder. `amount_threshold` is the only required parameter.
    ///
    /// Default values: no suspicious accounts, no high-risk locations,
    /// `unusual_location_check = true`.
    #[must_use]
    pub fn builder(amount_threshold: Decimal) -> RuleConfigBuilder {
        RuleConfigBuilder {
            amount_threshold,
            suspicious_accounts: HashSet::new(),
            high_risk_locations: vec![],
            unusual_location_check: true,
        }
    }
}

/// Trim every entry and drop the empty ones.
fn normalized<I, S>(entries: I) -> impl Iterator<Item = String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .filter_map(|e| {
            let e = e.as_ref().trim();
            (!e.is_empty()).then(|| e.to_owned())
        })
}

impl RuleConfigBuilder {
    /// Replace the suspicious-account set.
    #[must_use]
    pub fn suspicious_accounts<I, S>(mut self, accounts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.suspicious_accounts = normalized(accounts).collect();
        self
    }

    /// Replace the suspicious-account set from a comma-separated list.
    #[must_use]
    pub fn suspicious_accounts_csv(self, csv: &str) -> Self {
        self.suspicious_accounts(csv.split(','))
    }

    /// Replace the high-risk location list. Duplicates are dropped, order kept.
    #[must_use]
    pub fn high_risk_locations<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        self.high_risk_locations = normalized(locations).filter(|l| seen.insert(l.clone())).collect();
        self
    }

    /// Replace the high-risk location list from a comma-separated list.
    #[must_use]
    pub fn high_risk_locations_csv(self, csv: &str) -> Self {
        self.high_risk_locations(csv.split(','))
    }

    /// Enable or disable the high-risk location rule.
    #[must_use]
    pub fn unusual_location_check(mut self, enabled: bool) -> Self {
        self.unusual_location_check = enabled;
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RuleConfigError::InvalidConfig`] when `amount_threshold` is negative.
    #[must_use = "the Result must be checked; use ? or unwrap"]
    pub fn build(self) -> Result<RuleConfig, RuleConfigError> {
        if self.amount_threshold < Decimal::ZERO {
            return Err(RuleConfigError::InvalidConfig {
                reason: format!("amount_threshold must be >= 0, got {}", self.amount_threshold),
            });
        }
        Ok(RuleConfig {
            amount_threshold: self.amount_threshold,
            suspicious_accounts: self.suspicious_accounts,
            high_risk_locations: self.high_risk_locations,
            unusual_location_check: self.unusual_location_check,
        })
    }
}

// ---------------------------------------------------------------------------
// RuleEngine
// ---------------------------------------------------------------------------

/// Pipeline component that implements the `domain::Evaluator` port.
///
/// Owns its [`RuleConfig`] and never mutates it, so a shared `&RuleEngine`
/// can be read from anywhere without locking.
#[derive(Debug)]
pub struct RuleEngine {
    config: RuleConfig,
}

impl RuleEngine {
    /// Create an engine over `config`.
    #[must_use]
    pub fn new(config: RuleConfig) -> Self {
        tracing::info!(
            amount_threshold = %config.amount_threshold,
            suspicious_accounts = config.suspicious_accounts.len(),
            high_risk_locations = config.high_risk_locations.len(),
            unusual_location_check = config.unusual_location_check,
            "rule_engine.init"
        );
        Self { config }
    }

    /// The configuration this engine evaluates against.
    #[must_use]
    pub fn config(&self) -> &RuleConfig {
        &self.config
    }

    /// Evaluate `transaction`, stamping the verdict with `detected_at`.
    ///
    /// Every rule is checked; reasons keep the order amount, account, location.
    #[must_use]
    pub fn evaluate_at(&self, transaction: &Transaction, detected_at: DateTime<Utc>) -> Verdict {
        let reasons: Vec<String> = [
            self.amount_reason(transaction),
            self.account_reason(transaction),
            self.location_reason(transaction),
        ]
        .into_iter()
        .flatten()
        .collect();

        let verdict = Verdict::from_reasons(transaction.transaction_id.clone(), reasons, detected_at);
        if verdict.is_fraudulent {
            tracing::warn!(
                transaction_id = %verdict.transaction_id,
                reasons = ?verdict.reasons,
                "rule_engine.verdict.fraud"
            );
        } else {
            tracing::debug!(
                transaction_id = %verdict.transaction_id,
                amount = %transaction.amount,
                "rule_engine.verdict.clean"
            );
        }
        verdict
    }

    fn amount_reason(&self, transaction: &Transaction) -> Option<String> {
        (transaction.amount > self.config.amount_threshold).then(|| {
            format!(
                "The transaction amount of {:.2} exceeds the threshold of {:.2}.",
                two_places(transaction.amount),
                two_places(self.config.amount_threshold)
            )
        })
    }

    fn account_reason(&self, transaction: &Transaction) -> Option<String> {
        self.config.suspicious_accounts.contains(&transaction.account_id).then(|| {
            format!("Account {} belongs to a known suspicious account.", transaction.account_id)
        })
    }

    fn location_reason(&self, transaction: &Transaction) -> Option<String> {
        (self.config.unusual_location_check && self.is_high_risk_location(&transaction.location))
            .then(|| {
                format!(
                    "The transaction location {} belongs to a high risk area.",
                    transaction.location
                )
            })
    }

    fn is_high_risk_location(&self, location: &str) -> bool {
        let location = location.trim();
        !location.is_empty()
            && self.config.high_risk_locations.iter().any(|entry| location.contains(entry.as_str()))
    }
}

/// Round half away from zero to two decimal places; `{:.2}` alone truncates.
fn two_places(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

impl Evaluator for RuleEngine {
    /// Evaluate `transaction` now. Total: never fails.
    fn evaluate(&self, transaction: &Transaction) -> Verdict {
        self.evaluate_at(transaction, Utc::now())
    }
}
