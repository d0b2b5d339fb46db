// Rust guideline compliant 2026-10-16

//! Environment-driven configuration for the fraud-detection binary.
//!
//! Every setting has a default; a malformed value is an error, never silently
//! replaced by the default. Variable lookup goes through a caller-supplied
//! function so tests never touch the process environment.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use ingestion::{IngestionConfig, IngestionError};
use rule_engine::{RuleConfig, RuleConfigError};
use rust_decimal::Decimal;

/// Error reading the environment.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The variable is set but cannot be parsed.
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        /// Environment variable name.
        key: &'static str,
        /// Raw value as read from the environment.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Settings for one pipeline run, before validation by each component.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Amounts strictly above this are flagged.
    pub amount_threshold: Decimal,
    /// Comma-separated account ids.
    pub suspicious_accounts: String,
    /// Comma-separated location fragments.
    pub risk_locations: String,
    /// Enables the high-risk location rule.
    pub unusual_location_check: bool,
    /// Queue identifier, used in logs.
    pub queue_url: String,
    /// Maximum number of messages requested per poll.
    pub max_messages: usize,
    /// Long-poll wait window for each receive call.
    pub wait_time: Duration,
    /// Interval between polling cycles.
    pub poll_interval: Duration,
    /// Delay before an unacknowledged message is redelivered.
    pub visibility_timeout: Duration,
    /// Topic alerts are published to.
    pub alert_topic: String,
}

impl AppConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for the first malformed variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for the first malformed variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            amount_threshold: parse(&lookup, "FRAUD_RULE_AMOUNT_THRESHOLD", Decimal::from(10_000))?,
            suspicious_accounts: lookup("FRAUD_RULE_SUSPICIOUS_ACCOUNTS").unwrap_or_default(),
            risk_locations: lookup("FRAUD_RULE_RISK_LOCATIONS").unwrap_or_default(),
            unusual_location_check: parse_flag(&lookup, "FRAUD_RULE_UNUSUAL_LOCATION_ENABLE", true)?,
            queue_url: lookup("QUEUE_URL").unwrap_or_else(|| "memory://transactions".to_owned()),
            max_messages: parse(&lookup, "QUEUE_MAX_MESSAGES", 10)?,
            wait_time: Duration::from_secs(parse(&lookup, "QUEUE_WAIT_SECONDS", 20)?),
            poll_interval: Duration::from_millis(parse(&lookup, "QUEUE_POLLING_RATE_MS", 5_000)?),
            visibility_timeout: Duration::from_secs(parse(
                &lookup,
                "QUEUE_VISIBILITY_TIMEOUT_SECONDS",
                30,
            )?),
            alert_topic: lookup("ALERT_TOPIC").unwrap_or_else(|| "fraud-alerts".to_owned()),
        })
    }

    /// Rule configuration built from the `FRAUD_RULE_*` settings.
    ///
    /// # Errors
    ///
    /// Returns [`RuleConfigError::InvalidConfig`] when the threshold is negative.
    pub fn rule_config(&self) -> Result<RuleConfig, RuleConfigError> {
        RuleConfig::builder(self.amount_threshold)
            .suspicious_accounts_csv(&self.suspicious_accounts)
            .high_risk_locations_csv(&self.risk_locations)
            .unusual_location_check(self.unusual_location_check)
            .build()
    }

    /// Ingestion configuration built from the `QUEUE_*` settings.
    ///
    /// # Errors
    ///
    /// Returns [`IngestionError::InvalidConfig`] when a count or duration is zero.
    pub fn ingestion_config(&self) -> Result<IngestionConfig, IngestionError> {
        IngestionConfig::builder(self.max_messages)
            .wait_time(self.wait_time)
            .poll_interval(self.poll_interval)
            .build()
    }
}

fn parse<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

/// Like [`parse`] for booleans, but case-insensitive.
fn parse_flag<F>(lookup: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key,
                value,
                reason: "expected true or false".to_owned(),
            }),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::time::Duration;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.amount_threshold, dec!(10000));
        assert_eq!(config.suspicious_accounts, "");
        assert!(config.unusual_location_check);
        assert_eq!(config.queue_url, "memory://transactions");
        assert_eq!(config.max_messages, 10);
        assert_eq!(config.wait_time, Duration::from_secs(20));
        assert_eq!(config.poll_interval, Duration::from_millis(5_000));
        assert_eq!(config.visibility_timeout, Duration::from_secs(30));
        assert_eq!(config.alert_topic, "fraud-alerts");
    }

    #[test]
    fn overrides_are_applied() {
        let config = from_pairs(&[
            ("FRAUD_RULE_AMOUNT_THRESHOLD", " 2500.50 "),
            ("FRAUD_RULE_SUSPICIOUS_ACCOUNTS", "ACC-1,ACC-2"),
            ("FRAUD_RULE_UNUSUAL_LOCATION_ENABLE", "FALSE"),
            ("QUEUE_MAX_MESSAGES", "5"),
            ("QUEUE_POLLING_RATE_MS", "250"),
            ("ALERT_TOPIC", "arn:alerts"),
        ])
        .unwrap();
        assert_eq!(config.amount_threshold, dec!(2500.50));
        assert!(!config.unusual_location_check);
        assert_eq!(config.max_messages, 5);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.alert_topic, "arn:alerts");

        let rules = config.rule_config().unwrap();
        assert!(rules.suspicious_accounts.contains("ACC-2"));
    }

    #[test]
    fn malformed_number_is_rejected() {
        let err = from_pairs(&[("QUEUE_MAX_MESSAGES", "ten")]).unwrap_err();
        let ConfigError::Invalid { key, value, reason } = &err;
        assert_eq!(*key, "QUEUE_MAX_MESSAGES");
        assert_eq!(value, "ten");
        assert!(!reason.is_empty(), "parse error is kept");
        assert!(err.to_string().contains(reason.as_str()));
    }

    #[test]
    fn malformed_flag_is_rejected() {
        let result = from_pairs(&[("FRAUD_RULE_UNUSUAL_LOCATION_ENABLE", "yes")]);
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { key: "FRAUD_RULE_UNUSUAL_LOCATION_ENABLE", ref reason, .. })
                if reason == "expected true or false"
        ));
    }

    #[test]
    fn zero_batch_size_fails_ingestion_validation() {
        let config = from_pairs(&[("QUEUE_MAX_MESSAGES", "0")]).unwrap();
        assert!(matches!(
            config.ingestion_config(),
            Err(ingestion::IngestionError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn negative_threshold_fails_rule_validation() {
        let config = from_pairs(&[("FRAUD_RULE_AMOUNT_THRESHOLD", "-1")]).unwrap();
        assert!(config.rule_config().is_err_and(|e| e.to_string().contains("threshold")));
    }
}
