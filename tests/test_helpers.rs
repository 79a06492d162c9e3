use std::sync::Arc;

use pairlink_server::config::ProtocolConfig;
use pairlink_server::rate_limit::RateLimiterConfig;
use pairlink_server::server::{PairServer, ServerConfig};
use tokio::time::Duration;

/// Create a test server with defaults tuned for fast tests
#[allow(dead_code)]
pub fn create_test_server() -> Arc<PairServer> {
    create_test_server_with_config(test_server_config(), ProtocolConfig::default())
}

#[allow(dead_code)]
pub fn create_test_server_with_config(
    server_config: ServerConfig,
    protocol_config: ProtocolConfig,
) -> Arc<PairServer> {
    PairServer::new(server_config, protocol_config)
}

/// Server configuration optimized for testing
#[allow(dead_code)]
pub fn test_server_config() -> ServerConfig {
    ServerConfig {
        idle_timeout: Duration::from_secs(600),
        search_timeout: Duration::from_secs(180),
        cleanup_interval: Duration::from_secs(1), // Fast cleanup for tests
        matching_interval: Duration::from_millis(50), // Fast matching for tests
        wait_estimate_per_user: 2,
        max_message_size: 65536,
        max_connections_per_ip: 100, // Generous for tests
        rate_limiter: RateLimiterConfig {
            max_records: 10_000,
            sweep_interval: Duration::from_secs(300),
        },
    }
}
