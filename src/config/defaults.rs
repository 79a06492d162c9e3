//! Default value functions for configuration fields, referenced by serde's
//! `#[serde(default = ...)]` attributes.

use super::logging::LogFormat;

// =============================================================================
// Port & Root Config
// =============================================================================

pub const fn default_port() -> u16 {
    3545
}

// =============================================================================
// Server Defaults
// =============================================================================

/// Sessions idle longer than this are evicted (seconds).
pub const fn default_idle_timeout() -> u64 {
    600 // 10 minutes
}

/// Sessions stuck searching longer than this are reset to idle (seconds).
pub const fn default_search_timeout() -> u64 {
    180 // 3 minutes
}

pub const fn default_cleanup_interval() -> u64 {
    60
}

/// Matching sweep cadence (milliseconds).
pub const fn default_matching_interval_ms() -> u64 {
    2000
}

/// Rough per-queued-user wait estimate reported in `queue-status` (seconds).
pub const fn default_wait_estimate_per_user() -> u64 {
    2
}

// =============================================================================
// Rate Limit Defaults
// =============================================================================

pub const fn default_max_rate_limit_records() -> usize {
    10_000
}

pub const fn default_rate_limit_sweep_interval() -> u64 {
    300
}

// =============================================================================
// Protocol Defaults
// =============================================================================

pub const fn default_min_username_length() -> usize {
    2
}

pub const fn default_max_username_length() -> usize {
    20
}

pub fn default_restricted_words() -> Vec<String> {
    ["admin", "moderator", "support", "system", "root"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub const fn default_max_interests() -> usize {
    5
}

pub const fn default_max_interest_length() -> usize {
    20
}

pub const fn default_max_language_length() -> usize {
    5
}

pub const fn default_max_region_length() -> usize {
    10
}

/// Cap on sanitized free text (report/rejection reasons).
pub const fn default_max_reason_length() -> usize {
    200
}

// =============================================================================
// Security Defaults
// =============================================================================

pub fn default_cors_origins() -> String {
    "*".to_string()
}

pub const fn default_max_message_size() -> usize {
    65536 // 64KB
}

pub const fn default_max_connections_per_ip() -> usize {
    10
}

// =============================================================================
// Logging Defaults
// =============================================================================

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "server.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub const fn default_enable_file_logging() -> bool {
    false
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Text
}
