//! Repair controller configuration.
//!
//! Durations are written as strings (`"90s"`, `"500ms"`, `"5m"`, or a
//! bare number of seconds) so configs stay readable in TOML.

use std::time::Duration;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("max_attempts must be at least 1")]
    ZeroMaxAttempts,
}

/// Tunables for the repair workflow.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RepairConfig {
    /// Maximum simultaneous repair actions across all nodes.
    pub concurrency: usize,

    /// Repair attempts per unhealthy episode before giving up.
    pub max_attempts: u32,

    /// How long a node must be continuously unhealthy before the first
    /// attempt.
    #[serde(deserialize_with = "duration_string")]
    pub unhealthy_time: Duration,

    /// How long to wait for a repair attempt to take effect before
    /// declaring it failed.
    #[serde(deserialize_with = "duration_string")]
    pub repair_timeout: Duration,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            max_attempts: 3,
            unhealthy_time: Duration::from_secs(120),
            repair_timeout: Duration::from_secs(180),
        }
    }
}

impl RepairConfig {
    /// Check the integer bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroMaxAttempts);
        }
        Ok(())
    }
}

/// Parse a duration string like "5s", "500ms", "2m", or bare seconds.
fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

fn duration_string<'de, D>(de: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(de)?;
    parse_duration(&s)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid duration: {s:?}")))
}
