//! Polling configuration for long-running operations
//!
//! Profiles may carry a `[profiles.<name>.polling]` table; anything left out
//! falls back to the defaults below.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Poll interval and upper bound for a single long-running operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Time between two consecutive status reads
    pub interval: Duration,
    /// Maximum time to wait for one operation to reach a terminal state
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        PollSettings::default().to_poll_config()
    }
}

impl PollConfig {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// Serialized form of [`PollConfig`] as stored in profiles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSettings {
    /// Seconds between status reads
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Seconds before an operation is abandoned
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl PollSettings {
    pub fn to_poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(self.interval_secs),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

fn default_interval_secs() -> u64 {
    10
}

fn default_timeout_secs() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_ten_second_interval() {
        let config = PollConfig::default();
        assert_eq!(config.interval, Duration::from_secs(10));
        assert_eq!(config.timeout, Duration::from_secs(3600));
    }

    #[test]
    fn partial_table_fills_defaults() {
        let settings: PollSettings = toml::from_str("interval_secs = 2").unwrap();
        assert_eq!(settings.interval_secs, 2);
        assert_eq!(settings.timeout_secs, 3600);
    }
}
