use crate::protocol::{validation, EndReason, ServerMessage, SessionId};

use super::PairServer;

impl PairServer {
    /// A relay is allowed only when the sender has a session and the
    /// declared recipient is its current peer. Anything else is dropped
    /// with a warning; the sender never learns whether the target exists.
    async fn authorize_relay(&self, from: &SessionId, to: &SessionId) -> bool {
        let Some(peer_id) = self.registry.peer_of(from).await else {
            tracing::warn!(from = %from, to = %to, "Relay from session without a peer dropped");
            return false;
        };
        if peer_id != *to {
            tracing::warn!(from = %from, to = %to, peer = %peer_id, "Relay to non-peer dropped");
            return false;
        }
        true
    }

    pub(super) async fn handle_offer(
        &self,
        session_id: &SessionId,
        offer: serde_json::Value,
        to: SessionId,
    ) {
        if !self.authorize_relay(session_id, &to).await {
            return;
        }
        let Some(sender) = self.registry.get(session_id).await else {
            return;
        };
        self.send_to_session(
            &to,
            ServerMessage::Offer {
                offer,
                from: *session_id,
                from_username: sender.username,
            },
        );
    }

    pub(super) async fn handle_answer(
        &self,
        session_id: &SessionId,
        answer: serde_json::Value,
        to: SessionId,
    ) {
        if !self.authorize_relay(session_id, &to).await {
            return;
        }
        self.send_to_session(
            &to,
            ServerMessage::Answer {
                answer,
                from: *session_id,
            },
        );
    }

    pub(super) async fn handle_ice_candidate(
        &self,
        session_id: &SessionId,
        candidate: serde_json::Value,
        to: SessionId,
    ) {
        if !self.authorize_relay(session_id, &to).await {
            return;
        }
        self.send_to_session(
            &to,
            ServerMessage::IceCandidate {
                candidate,
                from: *session_id,
            },
        );
    }

    /// Confirm this side of a pending call and tell the peer.
    pub(super) async fn handle_call_accepted(&self, session_id: &SessionId) {
        let Some(peer_id) = self.registry.peer_of(session_id).await else {
            tracing::warn!(session_id = %session_id, "call-accepted without a peer");
            return;
        };
        if let Some(event) = self.registry.activate_connection(session_id).await {
            self.dispatch_events(vec![event]);
        }
        self.send_to_session(&peer_id, ServerMessage::CallAccepted);
    }

    /// Decline a pending call: notify the peer with the sanitized reason,
    /// tear the pairing down, then put the rejected peer back in the queue.
    pub(super) async fn handle_call_rejected(
        &self,
        session_id: &SessionId,
        reason: Option<String>,
    ) {
        let Some(peer_id) = self.registry.peer_of(session_id).await else {
            tracing::warn!(session_id = %session_id, "call-rejected without a peer");
            return;
        };

        let reason = reason
            .map(|r| validation::sanitize_text(&r, self.protocol_config.max_reason_length))
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "Call rejected by peer".to_string());
        self.send_to_session(
            &peer_id,
            ServerMessage::CallRejected {
                from: *session_id,
                reason,
            },
        );

        if let Some(event) = self
            .registry
            .end_connection(session_id, EndReason::CallRejected)
            .await
        {
            self.dispatch_events(vec![event]);
        }

        // The rejected side goes straight back to searching.
        if let Err(err) = self.registry.start_searching(&peer_id).await {
            tracing::warn!(peer = %peer_id, error = %err, "Re-queue after rejection failed");
        } else {
            self.send_to_session(&peer_id, ServerMessage::SearchStarted);
            self.send_queue_status(&peer_id).await;
        }
    }

    /// Record a user report. Reports only change logs, never session state;
    /// the reporter gets an acknowledgement either way.
    pub(super) async fn handle_report(
        &self,
        session_id: &SessionId,
        reported_user_id: SessionId,
        reason: String,
    ) {
        let reason = validation::sanitize_text(&reason, self.protocol_config.max_reason_length);
        let reporter = self.registry.get(session_id).await;
        let reported = self.registry.get(&reported_user_id).await;

        match (reporter, reported) {
            (Some(reporter), Some(reported)) if !reason.is_empty() => {
                tracing::warn!(
                    reporter = %reporter.username,
                    reporter_id = %session_id,
                    reported = %reported.username,
                    reported_id = %reported_user_id,
                    reason = %reason,
                    "User report"
                );
                self.send_to_session(
                    session_id,
                    ServerMessage::ReportSubmitted {
                        message: "Report submitted successfully. Thank you.".to_string(),
                    },
                );
            }
            _ => {
                tracing::warn!(
                    session_id = %session_id,
                    reported_id = %reported_user_id,
                    "Invalid report"
                );
                self.send_to_session(
                    session_id,
                    ServerMessage::ReportError {
                        message: "Invalid report data".to_string(),
                    },
                );
            }
        }
    }
}
