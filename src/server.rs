use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Duration;

use crate::config::{Config, ProtocolConfig};
use crate::protocol::{ServerMessage, SessionId};
use crate::rate_limit::{ActionRateLimiter, RateLimiterConfig};

mod connection_manager;
mod maintenance;
mod matchmaker;
mod message_router;
mod registry;
mod relay;
mod session_service;

pub use connection_manager::{ClientSender, ConnectionManager};
pub use registry::{RegistryError, RegistryEvent, RegistryStats, SessionRegistry};

/// Runtime tuning knobs, resolved from [`Config`] into concrete durations.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub idle_timeout: Duration,
    pub search_timeout: Duration,
    pub cleanup_interval: Duration,
    pub matching_interval: Duration,
    /// Seconds of estimated wait added per user already searching
    pub wait_estimate_per_user: u64,
    pub max_message_size: usize,
    pub max_connections_per_ip: usize,
    pub rate_limiter: RateLimiterConfig,
}

impl ServerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            idle_timeout: Duration::from_secs(config.server.idle_timeout),
            search_timeout: Duration::from_secs(config.server.search_timeout),
            cleanup_interval: Duration::from_secs(config.server.cleanup_interval),
            matching_interval: Duration::from_millis(config.server.matching_interval_ms),
            wait_estimate_per_user: config.server.wait_estimate_per_user,
            max_message_size: config.security.max_message_size,
            max_connections_per_ip: config.security.max_connections_per_ip,
            rate_limiter: RateLimiterConfig {
                max_records: config.rate_limit.max_records,
                sweep_interval: Duration::from_secs(config.rate_limit.sweep_interval),
            },
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[derive(Debug, Error)]
pub enum RegisterClientError {
    #[error("too many connections from this address")]
    IpLimitExceeded,
}

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: chrono::DateTime<Utc>,
    pub total_users: usize,
    pub users_searching: usize,
    pub users_in_call: usize,
}

/// Top-level pairing server: owns the session registry, the per-client
/// outbound channels, and the rate limiter. Handlers live in the server
/// submodules and all route through this struct.
pub struct PairServer {
    registry: SessionRegistry,
    connections: ConnectionManager,
    rate_limiter: ActionRateLimiter,
    config: ServerConfig,
    protocol_config: ProtocolConfig,
}

impl PairServer {
    pub fn new(config: ServerConfig, protocol_config: ProtocolConfig) -> Arc<Self> {
        let connections = ConnectionManager::new(config.max_connections_per_ip);
        let rate_limiter = ActionRateLimiter::new(config.rate_limiter.clone());
        Arc::new(Self {
            registry: SessionRegistry::new(),
            connections,
            rate_limiter,
            config,
            protocol_config,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn protocol_config(&self) -> &ProtocolConfig {
        &self.protocol_config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Allocate a session id for a fresh socket and wire up its outbound
    /// channel. The session itself is created later, on `join`.
    pub fn register_client(
        &self,
        sender: mpsc::Sender<Arc<ServerMessage>>,
        addr: SocketAddr,
    ) -> Result<SessionId, RegisterClientError> {
        let session_id = self.connections.register(sender, addr)?;
        tracing::info!(session_id = %session_id, client_addr = %addr, "Client connected");
        Ok(session_id)
    }

    /// Tear down everything a socket owned: registry record (with peer
    /// unwind), outbound channel, and rate-limit history.
    pub async fn unregister_client(&self, session_id: &SessionId) {
        if let Some((session, events)) = self.registry.remove_session(session_id).await {
            tracing::info!(
                session_id = %session_id,
                username = %session.username,
                "Client disconnected"
            );
            self.dispatch_events(events);
        } else {
            tracing::debug!(session_id = %session_id, "Client disconnected before joining");
        }
        self.connections.remove(session_id);
        self.rate_limiter.forget_client(session_id).await;
    }

    pub(crate) fn send_to_session(&self, session_id: &SessionId, message: ServerMessage) {
        self.connections.send(session_id, Arc::new(message));
    }

    pub(crate) fn send_error(
        &self,
        session_id: &SessionId,
        message: String,
        code: Option<crate::protocol::ErrorCode>,
    ) {
        self.send_to_session(session_id, ServerMessage::Error { message, code });
    }

    /// Turn registry events into outbound messages.
    pub(crate) fn dispatch_events(&self, events: Vec<RegistryEvent>) {
        for event in events {
            match event {
                RegistryEvent::Paired { a, b } => {
                    self.send_to_session(
                        &a.id,
                        ServerMessage::PeerFound {
                            peer_id: b.id,
                            peer_username: b.username.clone(),
                        },
                    );
                    self.send_to_session(
                        &b.id,
                        ServerMessage::PeerFound {
                            peer_id: a.id,
                            peer_username: a.username,
                        },
                    );
                }
                RegistryEvent::CallActive { session, peer } => {
                    tracing::info!(
                        session = %session.username,
                        peer = %peer.username,
                        "Call active"
                    );
                }
                RegistryEvent::Ended {
                    session,
                    peer,
                    reason,
                } => {
                    self.send_to_session(
                        &session.id,
                        ServerMessage::CallEnded {
                            reason: reason.initiator_message().to_string(),
                        },
                    );
                    if let Some(peer) = peer {
                        self.send_to_session(
                            &peer.id,
                            ServerMessage::CallEnded {
                                reason: reason.peer_message().to_string(),
                            },
                        );
                    }
                }
                RegistryEvent::SearchTimedOut { session } => {
                    self.send_to_session(
                        &session.id,
                        ServerMessage::SearchTimeout {
                            message: "Your search timed out. Please try again.".to_string(),
                        },
                    );
                }
            }
        }
    }

    pub async fn health_status(&self) -> HealthStatus {
        let stats = self.registry.stats().await;
        HealthStatus {
            status: "ok",
            timestamp: Utc::now(),
            total_users: stats.total_users,
            users_searching: stats.users_searching,
            users_in_call: stats.users_in_call,
        }
    }
}
