//! Configuration
//!
//! Tunables for the transport, the poller, the endpoint cache and the
//! availability wait. Loading these values is the embedding application's
//! job; every field has a default and durations are written as seconds.

use crate::telemetry::LogLevel;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://management.azure.com/";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Management API root that relative request paths are joined onto
    pub base_url: String,
    /// `api-version` query parameter added to requests that don't carry one
    pub api_version: Option<String>,
    pub user_agent: String,
    /// Bearer token supplied by the embedding application
    pub bearer_token: Option<String>,
    /// Per-request timeout
    #[serde(with = "secs")]
    pub request_timeout: Duration,
    pub poll: PollConfig,
    pub cache: CacheConfig,
    pub availability: AvailabilityConfig,
    /// Level for [`crate::telemetry::init`]; nothing is installed unless the caller asks
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: None,
            user_agent: format!("arm-core/{}", env!("CARGO_PKG_VERSION")),
            bearer_token: None,
            request_timeout: Duration::from_secs(60),
            poll: PollConfig::default(),
            cache: CacheConfig::default(),
            availability: AvailabilityConfig::default(),
            log_level: LogLevel::Off,
        }
    }
}

/// Long-running operation polling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Delay before the first status check when the server gives no hint
    #[serde(with = "secs")]
    pub initial_interval: Duration,
    /// Ceiling for the computed backoff
    #[serde(with = "secs")]
    pub max_interval: Duration,
    pub multiplier: f64,
    /// Consecutive transient failures tolerated before giving up
    pub max_transient_retries: u32,
    /// Overall deadline for polling an accepted operation
    #[serde(with = "secs")]
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(5),
            max_interval: Duration::from_secs(60),
            multiplier: 2.0,
            max_transient_retries: 5,
            timeout: Duration::from_secs(30 * 60),
        }
    }
}

/// Endpoint resolution cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Point lookups in flight at once while reconciling a sweep
    pub max_concurrent_lookups: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_concurrent_lookups: 8,
        }
    }
}

/// Waiting for a freshly created data-plane endpoint to answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailabilityConfig {
    pub enabled: bool,
    /// Delay before the first probe
    #[serde(with = "secs")]
    pub delay: Duration,
    #[serde(with = "secs")]
    pub interval: Duration,
    /// Consecutive successful probes required
    pub required_successes: u32,
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            delay: Duration::from_secs(30),
            interval: Duration::from_secs(10),
            required_successes: 10,
        }
    }
}

/// Durations as (fractional) seconds
mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
