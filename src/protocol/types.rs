use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier for one connected client's session.
/// Assigned by the server at WebSocket registration time.
pub type SessionId = Uuid;

/// Lifecycle state of a session.
///
/// `Connecting` and `InCall` always carry a reciprocal peer link;
/// `Idle` and `Searching` never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Searching,
    Connecting,
    InCall,
}

impl SessionStatus {
    /// Whether this status requires a peer link to be present.
    pub fn requires_peer(self) -> bool {
        matches!(self, Self::Connecting | Self::InCall)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Searching => "searching",
            Self::Connecting => "connecting",
            Self::InCall => "in_call",
        };
        f.write_str(s)
    }
}

/// Declared matchmaking preferences, normalized by
/// [`crate::protocol::validation::sanitize_preferences`] before storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interests: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_group: Option<String>,
}

impl Preferences {
    pub fn is_empty(&self) -> bool {
        self.language.is_none()
            && self.interests.is_empty()
            && self.region.is_none()
            && self.age_group.is_none()
    }
}

/// Client-visible view of a session, sent in `join-success` and carried by
/// registry domain events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub username: String,
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_id: Option<SessionId>,
    pub preferences: Preferences,
    pub joined_at: DateTime<Utc>,
}

/// Why a connection was torn down.
///
/// Known codes map to per-side human-readable phrasings; unrecognized codes
/// survive verbatim in `Other` and render the generic message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    UserEnded,
    UserDisconnected,
    NextPeer,
    ConnectionTimeout,
    CallRejected,
    /// Reason code reserved for the wire; search timeouts are delivered as a
    /// dedicated `search-timeout` event rather than a call teardown.
    SearchTimeout,
    Other(String),
}

impl EndReason {
    pub fn as_code(&self) -> &str {
        match self {
            Self::UserEnded => "user_ended",
            Self::UserDisconnected => "user_disconnected",
            Self::NextPeer => "next_peer",
            Self::ConnectionTimeout => "connection_timeout",
            Self::CallRejected => "call_rejected",
            Self::SearchTimeout => "search_timeout",
            Self::Other(code) => code,
        }
    }

    /// Message shown to the session that initiated (or caused) the teardown.
    pub fn initiator_message(&self) -> &'static str {
        match self {
            Self::UserEnded => "You ended the call.",
            Self::UserDisconnected => "Your peer disconnected.",
            Self::NextPeer => "Searching for next peer.",
            Self::ConnectionTimeout => "Connection timed out.",
            Self::CallRejected => "Call was rejected by peer.",
            Self::SearchTimeout => "Search timed out.",
            Self::Other(_) => "Call ended",
        }
    }

    /// Message shown to the other side. `user_ended` and `next_peer` get
    /// distinct phrasing so the peer knows the call was ended remotely.
    pub fn peer_message(&self) -> &'static str {
        match self {
            Self::UserEnded | Self::NextPeer => "Your peer ended the call.",
            other => other.initiator_message(),
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_peer_requirement() {
        assert!(!SessionStatus::Idle.requires_peer());
        assert!(!SessionStatus::Searching.requires_peer());
        assert!(SessionStatus::Connecting.requires_peer());
        assert!(SessionStatus::InCall.requires_peer());
    }

    #[test]
    fn end_reason_per_side_phrasing() {
        assert_eq!(
            EndReason::UserEnded.initiator_message(),
            "You ended the call."
        );
        assert_eq!(
            EndReason::UserEnded.peer_message(),
            "Your peer ended the call."
        );
        assert_eq!(
            EndReason::NextPeer.peer_message(),
            "Your peer ended the call."
        );
        // Symmetric reasons read the same from both sides
        assert_eq!(
            EndReason::UserDisconnected.initiator_message(),
            EndReason::UserDisconnected.peer_message()
        );
    }

    #[test]
    fn unknown_reason_passes_code_through_with_generic_message() {
        let reason = EndReason::Other("server_restart".to_string());
        assert_eq!(reason.as_code(), "server_restart");
        assert_eq!(reason.initiator_message(), "Call ended");
        assert_eq!(reason.peer_message(), "Call ended");
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::InCall).unwrap(),
            "\"in_call\""
        );
        assert_eq!(
            serde_json::from_str::<SessionStatus>("\"searching\"").unwrap(),
            SessionStatus::Searching
        );
    }
}
