use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::{ServerMessage, SessionId};

use super::RegisterClientError;

pub type ClientSender = mpsc::Sender<Arc<ServerMessage>>;

struct ClientConnection {
    sender: ClientSender,
    client_addr: SocketAddr,
}

/// Outbound half of every connected socket, keyed by session id, plus a
/// per-address connection count used to cap abusive clients.
pub struct ConnectionManager {
    clients: DashMap<SessionId, ClientConnection>,
    per_ip: DashMap<IpAddr, usize>,
    max_connections_per_ip: usize,
}

impl ConnectionManager {
    pub fn new(max_connections_per_ip: usize) -> Self {
        Self {
            clients: DashMap::new(),
            per_ip: DashMap::new(),
            max_connections_per_ip,
        }
    }

    /// Register a new socket, enforcing the per-address cap. Returns the
    /// freshly minted session id.
    pub fn register(
        &self,
        sender: ClientSender,
        addr: SocketAddr,
    ) -> Result<SessionId, RegisterClientError> {
        let ip = addr.ip();
        {
            let mut count = self.per_ip.entry(ip).or_insert(0);
            if *count >= self.max_connections_per_ip {
                tracing::warn!(client_addr = %addr, "Connection limit reached for address");
                return Err(RegisterClientError::IpLimitExceeded);
            }
            *count += 1;
        }

        let session_id = Uuid::new_v4();
        self.clients.insert(
            session_id,
            ClientConnection {
                sender,
                client_addr: addr,
            },
        );
        Ok(session_id)
    }

    pub fn remove(&self, session_id: &SessionId) {
        if let Some((_, connection)) = self.clients.remove(session_id) {
            let ip = connection.client_addr.ip();
            if let Some(mut count) = self.per_ip.get_mut(&ip) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    drop(count);
                    self.per_ip.remove_if(&ip, |_, c| *c == 0);
                }
            }
        }
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.clients.contains_key(session_id)
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Fire and forget. A full or closed channel drops the message; the
    /// disconnect path cleans the client up soon after.
    pub fn send(&self, session_id: &SessionId, message: Arc<ServerMessage>) {
        if let Some(connection) = self.clients.get(session_id) {
            if let Err(err) = connection.sender.try_send(message) {
                tracing::warn!(
                    session_id = %session_id,
                    error = %err,
                    "Failed to queue message for client"
                );
            }
        }
    }
}
