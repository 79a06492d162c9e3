//! Transport-surface security settings.

use super::defaults::{
    default_cors_origins, default_max_connections_per_ip, default_max_message_size,
};
use serde::{Deserialize, Serialize};

/// Security configuration for the WebSocket surface.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SecurityConfig {
    /// Comma-separated allowed CORS origins, or `*` for permissive
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
    /// Maximum accepted frame size (bytes)
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Maximum concurrent connections per client IP
    #[serde(default = "default_max_connections_per_ip")]
    pub max_connections_per_ip: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            cors_origins: default_cors_origins(),
            max_message_size: default_max_message_size(),
            max_connections_per_ip: default_max_connections_per_ip(),
        }
    }
}
