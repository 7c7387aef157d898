//! Application configuration loaded from environment variables.

use domain::{DiscountConfig, Money};

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DISCOUNT_PERCENTAGE_BPS`: store-wide percentage discount in basis points
/// - `DISCOUNT_FIXED_CENTS`: store-wide fixed discount in cents
///
/// Unset or unparsable discount variables leave the rule disabled.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub discount_percentage_bps: Option<u32>,
    pub discount_fixed_cents: Option<i64>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            discount_percentage_bps: lookup("DISCOUNT_PERCENTAGE_BPS")
                .and_then(|v| v.parse().ok()),
            discount_fixed_cents: lookup("DISCOUNT_FIXED_CENTS")
                .and_then(|v| v.parse().ok())
                .filter(|cents: &i64| *cents > 0),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Store-wide discount rules enabled by this configuration.
    pub fn discount_config(&self) -> DiscountConfig {
        let mut config = DiscountConfig::default();
        if let Some(bps) = self.discount_percentage_bps {
            config = config.with_percentage(bps);
        }
        if let Some(cents) = self.discount_fixed_cents {
            config = config.with_fixed(Money::from_cents(cents));
        }
        config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            discount_percentage_bps: None,
            discount_fixed_cents: None,
        }
    }
}
