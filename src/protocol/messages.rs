use serde::{Deserialize, Serialize};

use super::error_codes::ErrorCode;
use super::types::{SessionId, SessionSnapshot};

/// Message types sent from client to server.
///
/// Wire format: `{"type": "<kebab-case tag>", "data": {...}}` with camelCase
/// payload fields. Offer/answer/ICE payloads are opaque to the server and
/// relayed unmodified.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Register a session with a display name and optional preferences.
    /// Preferences arrive as arbitrary JSON and are sanitized server-side.
    Join {
        username: String,
        #[serde(default)]
        preferences: Option<serde_json::Value>,
    },
    /// Enter the matching queue
    Search,
    /// WebRTC offer for the declared peer
    Offer {
        offer: serde_json::Value,
        to: SessionId,
    },
    /// WebRTC answer for the declared peer
    Answer {
        answer: serde_json::Value,
        to: SessionId,
    },
    /// Trickle ICE candidate for the declared peer
    IceCandidate {
        candidate: serde_json::Value,
        to: SessionId,
    },
    /// This side confirmed the call
    CallAccepted,
    /// This side declined the pairing
    CallRejected {
        #[serde(default)]
        reason: Option<String>,
    },
    /// Hang up the active call
    EndCall,
    /// Hang up and immediately look for another peer
    NextPeer,
    /// Externally driven status change (only idle/searching are accepted)
    StatusUpdate { status: String },
    /// Flag another user for the moderation log
    ReportUser {
        reported_user_id: SessionId,
        reason: String,
    },
}

/// Message types sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// Session registered
    JoinSuccess { session: SessionSnapshot },
    /// Join rejected (validation failure, internal error)
    JoinError { message: String },
    /// Entered the matching queue
    SearchStarted,
    /// Search request refused
    SearchError { message: String },
    /// Queue position snapshot sent alongside `search-started`
    QueueStatus {
        position: usize,
        /// Rough estimate in seconds, derived from queue depth
        estimated_wait: u64,
        active_users: usize,
    },
    /// A compatible peer was found; negotiate with them
    PeerFound {
        peer_id: SessionId,
        peer_username: String,
    },
    /// Relayed WebRTC offer
    Offer {
        offer: serde_json::Value,
        from: SessionId,
        from_username: String,
    },
    /// Relayed WebRTC answer
    Answer {
        answer: serde_json::Value,
        from: SessionId,
    },
    /// Relayed ICE candidate
    IceCandidate {
        candidate: serde_json::Value,
        from: SessionId,
    },
    /// Peer confirmed the call
    CallAccepted,
    /// Peer declined the pairing
    CallRejected { from: SessionId, reason: String },
    /// Connection torn down; `reason` is the per-side human-readable message
    CallEnded { reason: String },
    /// Search aged out; client should retry explicitly
    SearchTimeout { message: String },
    /// Report recorded
    ReportSubmitted { message: String },
    /// Report rejected
    ReportError { message: String },
    /// Generic error with a structured code
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<ErrorCode>,
    },
}
