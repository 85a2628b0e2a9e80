//! Session store configuration.

use std::time::Duration;

use scout_core::defaults;

/// Configuration for [`crate::ConversationStateStore`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Idle time-to-live of an entry, in seconds.
    pub ttl_secs: u64,
    /// Maximum entries before least-recently-used eviction.
    pub max_entries: usize,
    /// Interval of the background sweep, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: defaults::STATE_TTL_SECS,
            max_entries: defaults::STATE_MAX_ENTRIES,
            sweep_interval_secs: defaults::STATE_SWEEP_INTERVAL_SECS,
        }
    }
}

impl SessionConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `STATE_CACHE_TTL_SECONDS` | `180` | Idle TTL per conversation |
    /// | `STATE_CACHE_MAXSIZE` | `1024` | Max tracked conversations |
    /// | `STATE_SWEEP_INTERVAL_SECONDS` | `60` | Background expiry sweep |
    pub fn from_env() -> Self {
        let ttl_secs = std::env::var("STATE_CACHE_TTL_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults::STATE_TTL_SECS);

        let max_entries = std::env::var("STATE_CACHE_MAXSIZE")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::STATE_MAX_ENTRIES)
            .max(1);

        let sweep_interval_secs = std::env::var("STATE_SWEEP_INTERVAL_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults::STATE_SWEEP_INTERVAL_SECS);

        Self {
            ttl_secs,
            max_entries,
            sweep_interval_secs,
        }
    }

    pub fn with_ttl_secs(mut self, secs: u64) -> Self {
        self.ttl_secs = secs;
        self
    }

    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    pub fn with_sweep_interval_secs(mut self, secs: u64) -> Self {
        self.sweep_interval_secs = secs;
        self
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.ttl(), Duration::from_secs(180));
        assert_eq!(config.max_entries, 1024);
    }

    #[test]
    fn test_builders() {
        let config = SessionConfig::default()
            .with_ttl_secs(30)
            .with_max_entries(2)
            .with_sweep_interval_secs(0);
        assert_eq!(config.ttl_secs, 30);
        assert_eq!(config.max_entries, 2);
        assert_eq!(config.sweep_interval(), Duration::from_secs(1));
    }
}
