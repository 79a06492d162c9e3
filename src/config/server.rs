//! Server behavior configuration types.

use super::defaults::{
    default_cleanup_interval, default_idle_timeout, default_matching_interval_ms,
    default_max_rate_limit_records, default_rate_limit_sweep_interval, default_search_timeout,
    default_wait_estimate_per_user,
};
use serde::{Deserialize, Serialize};

/// Server configuration for session lifecycle and the background sweeps.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Sessions idle longer than this are evicted (seconds)
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: u64,
    /// Sessions stuck searching longer than this are reset to idle (seconds)
    #[serde(default = "default_search_timeout")]
    pub search_timeout: u64,
    /// Interval for the cleanup sweep (seconds)
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval: u64,
    /// Interval for the matching sweep (milliseconds)
    #[serde(default = "default_matching_interval_ms")]
    pub matching_interval_ms: u64,
    /// Per-queued-user wait estimate reported in `queue-status` (seconds)
    #[serde(default = "default_wait_estimate_per_user")]
    pub wait_estimate_per_user: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            idle_timeout: default_idle_timeout(),
            search_timeout: default_search_timeout(),
            cleanup_interval: default_cleanup_interval(),
            matching_interval_ms: default_matching_interval_ms(),
            wait_estimate_per_user: default_wait_estimate_per_user(),
        }
    }
}

/// Rate limiter housekeeping configuration. Per-action limits are fixed
/// policy in [`crate::rate_limit::Action::limit`].
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RateLimitConfig {
    /// Hard cap on tracked (session, action) records
    #[serde(default = "default_max_rate_limit_records")]
    pub max_records: usize,
    /// Interval for the record eviction sweep (seconds)
    #[serde(default = "default_rate_limit_sweep_interval")]
    pub sweep_interval: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_records: default_max_rate_limit_records(),
            sweep_interval: default_rate_limit_sweep_interval(),
        }
    }
}
