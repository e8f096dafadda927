//! Platform configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TSUDOI_STORE_URL` - Connection string for the external store (secret)
//!
//! ## Optional
//! - `TSUDOI_STORE_TIMEOUT_SECS` - Timeout for a single store round trip
//!   (default: 10)
//! - `TSUDOI_CURRENCY` - ISO 4217 currency code for plan prices
//!   (default: JPY)

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use tsudoi_core::CurrencyCode;

const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is missing.
    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),
    /// A variable is present but unusable.
    #[error("invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Platform configuration.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// Connection string handed to the concrete store client (contains
    /// credentials).
    pub store_url: SecretString,
    /// Caller-supplied timeout for the single store round trip each
    /// operation performs.
    pub store_timeout: Duration,
    /// Currency applied to plan prices on ingest.
    pub currency: CurrencyCode,
}

impl PlatformConfig {
    /// Load configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a required variable is missing or a value
    /// does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary lookup function.
    ///
    /// Exists so tests can supply variables without touching the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Same conditions as [`PlatformConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let store_url = lookup("TSUDOI_STORE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("TSUDOI_STORE_URL".into()))?;

        let store_timeout_secs = match lookup("TSUDOI_STORE_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                ConfigError::InvalidEnvVar("TSUDOI_STORE_TIMEOUT_SECS".into(), e.to_string())
            })?,
            None => DEFAULT_STORE_TIMEOUT_SECS,
        };

        let currency = match lookup("TSUDOI_CURRENCY") {
            Some(raw) => raw
                .parse::<CurrencyCode>()
                .map_err(|e| ConfigError::InvalidEnvVar("TSUDOI_CURRENCY".into(), e))?,
            None => CurrencyCode::JPY,
        };

        Ok(Self {
            store_url: SecretString::from(store_url),
            store_timeout: Duration::from_secs(store_timeout_secs),
            currency,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn env<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (*v).to_owned())
        }
    }

    #[test]
    fn test_defaults() {
        let config =
            PlatformConfig::from_lookup(env(&[("TSUDOI_STORE_URL", "postgres://x")])).unwrap();
        assert_eq!(config.store_timeout, Duration::from_secs(10));
        assert_eq!(config.currency, CurrencyCode::JPY);
    }

    #[test]
    fn test_missing_store_url() {
        let err = PlatformConfig::from_lookup(env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(name) if name == "TSUDOI_STORE_URL"));
    }

    #[test]
    fn test_overrides() {
        let config = PlatformConfig::from_lookup(env(&[
            ("TSUDOI_STORE_URL", "postgres://x"),
            ("TSUDOI_STORE_TIMEOUT_SECS", "3"),
            ("TSUDOI_CURRENCY", "USD"),
        ]))
        .unwrap();
        assert_eq!(config.store_timeout, Duration::from_secs(3));
        assert_eq!(config.currency, CurrencyCode::USD);
    }

    #[test]
    fn test_invalid_timeout() {
        let err = PlatformConfig::from_lookup(env(&[
            ("TSUDOI_STORE_URL", "postgres://x"),
            ("TSUDOI_STORE_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(name, _) if name == "TSUDOI_STORE_TIMEOUT_SECS"));
    }

    #[test]
    fn test_invalid_currency() {
        let err = PlatformConfig::from_lookup(env(&[
            ("TSUDOI_STORE_URL", "postgres://x"),
            ("TSUDOI_CURRENCY", "BTC"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(name, _) if name == "TSUDOI_CURRENCY"));
    }
}
