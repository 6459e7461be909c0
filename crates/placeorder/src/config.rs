//! Engine configuration loaded from environment variables.

use std::time::Duration;

/// Timing configuration of the place-order engine.
///
/// Reads from environment variables:
/// - `PLACEORDER_LOCK_LEASE_MS`: lease of a held lock (default: `30000`)
/// - `PLACEORDER_LOCK_RETRY_MS`: pause between lock attempts while blocking (default: `100`)
/// - `PLACEORDER_BLOCKING_TIMEOUT_MS`: deadline of a blocking refresh (default: `10000`)
/// - `PLACEORDER_CONTEXT_TTL_SECS`: lifetime of a stored context (default: `7200`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrderConfig {
    pub lock_lease: Duration,
    pub lock_retry_interval: Duration,
    pub blocking_timeout: Duration,
    pub context_ttl: Duration,
}

impl PlaceOrderConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            lock_lease: millis(
                std::env::var("PLACEORDER_LOCK_LEASE_MS").ok(),
                defaults.lock_lease,
            ),
            lock_retry_interval: millis(
                std::env::var("PLACEORDER_LOCK_RETRY_MS").ok(),
                defaults.lock_retry_interval,
            ),
            blocking_timeout: millis(
                std::env::var("PLACEORDER_BLOCKING_TIMEOUT_MS").ok(),
                defaults.blocking_timeout,
            ),
            context_ttl: std::env::var("PLACEORDER_CONTEXT_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.context_ttl),
        }
    }
}

/// Upper bound of every millisecond setting.
const MAX_MILLIS: u64 = 24 * 60 * 60 * 1000;

fn millis(value: Option<String>, default: Duration) -> Duration {
    value
        .and_then(|v| v.parse::<u64>().ok())
        .map(|ms| Duration::from_millis(ms.min(MAX_MILLIS)))
        .unwrap_or(default)
}

impl Default for PlaceOrderConfig {
    fn default() -> Self {
        Self {
            lock_lease: Duration::from_secs(30),
            lock_retry_interval: Duration::from_millis(100),
            blocking_timeout: Duration::from_secs(10),
            context_ttl: Duration::from_secs(2 * 60 * 60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = PlaceOrderConfig::default();
        assert_eq!(config.lock_lease, Duration::from_secs(30));
        assert_eq!(config.lock_retry_interval, Duration::from_millis(100));
        assert_eq!(config.blocking_timeout, Duration::from_secs(10));
        assert_eq!(config.context_ttl, Duration::from_secs(7200));
    }

    #[test]
    fn test_millis_parsing() {
        let default = Duration::from_secs(1);
        assert_eq!(millis(Some("250".to_string()), default), Duration::from_millis(250));
        assert_eq!(millis(Some("soon".to_string()), default), default);
        assert_eq!(millis(None, default), default);
    }

    #[test]
    fn test_millis_are_capped_at_one_day() {
        let default = Duration::from_secs(1);
        assert_eq!(
            millis(Some(u64::MAX.to_string()), default),
            Duration::from_secs(24 * 60 * 60)
        );
    }
}
