//! Configuration sanity checks applied at startup.

use super::Config;

/// Validate a loaded configuration. Returns a combined, human-readable error
/// when any field is out of range; the binary refuses to start on failure.
pub fn validate_config(config: &Config) -> Result<(), String> {
    let mut problems = Vec::new();

    if config.protocol.min_username_length == 0 {
        problems.push("protocol.min_username_length must be at least 1".to_string());
    }
    if config.protocol.min_username_length > config.protocol.max_username_length {
        problems.push(format!(
            "protocol.min_username_length ({}) exceeds max_username_length ({})",
            config.protocol.min_username_length, config.protocol.max_username_length
        ));
    }
    if config.server.matching_interval_ms == 0 {
        problems.push("server.matching_interval_ms must be non-zero".to_string());
    }
    if config.server.cleanup_interval == 0 {
        problems.push("server.cleanup_interval must be non-zero".to_string());
    }
    if config.server.search_timeout >= config.server.idle_timeout {
        problems.push(format!(
            "server.search_timeout ({}) should be shorter than idle_timeout ({})",
            config.server.search_timeout, config.server.idle_timeout
        ));
    }
    if config.security.max_message_size < 1024 {
        problems.push("security.max_message_size must be at least 1024 bytes".to_string());
    }
    if config.rate_limit.max_records == 0 {
        problems.push("rate_limit.max_records must be non-zero".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems.join("\n"))
    }
}
