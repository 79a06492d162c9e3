use crate::protocol::{ClientMessage, ErrorCode, ServerMessage, SessionId};
use crate::rate_limit::Action;

use super::PairServer;

fn action_for(message: &ClientMessage) -> Action {
    match message {
        ClientMessage::Join { .. } => Action::Join,
        ClientMessage::Search => Action::Search,
        ClientMessage::Offer { .. } => Action::Offer,
        ClientMessage::Answer { .. } => Action::Answer,
        ClientMessage::IceCandidate { .. } => Action::IceCandidate,
        ClientMessage::CallAccepted => Action::CallAccepted,
        ClientMessage::CallRejected { .. } => Action::CallRejected,
        ClientMessage::EndCall => Action::EndCall,
        ClientMessage::NextPeer => Action::NextPeer,
        ClientMessage::StatusUpdate { .. } => Action::StatusUpdate,
        ClientMessage::ReportUser { .. } => Action::ReportUser,
    }
}

impl PairServer {
    /// Single entry point for every parsed inbound message. Each message
    /// passes the per-session rate limit for its action before reaching a
    /// handler; a denial answers the sender and goes no further.
    pub async fn handle_client_message(&self, session_id: &SessionId, message: ClientMessage) {
        let action = action_for(&message);
        if let Err(denied) = self.rate_limiter.check(*session_id, action).await {
            tracing::warn!(
                session_id = %session_id,
                action = denied.action,
                retry_after = ?denied.retry_after,
                "Rate limit exceeded"
            );
            self.send_to_session(
                session_id,
                ServerMessage::Error {
                    message: denied.to_string(),
                    code: Some(ErrorCode::RateLimit),
                },
            );
            return;
        }

        self.registry.touch(session_id).await;

        match message {
            ClientMessage::Join {
                username,
                preferences,
            } => self.handle_join(session_id, username, preferences).await,
            ClientMessage::Search => self.handle_search(session_id).await,
            ClientMessage::Offer { offer, to } => self.handle_offer(session_id, offer, to).await,
            ClientMessage::Answer { answer, to } => {
                self.handle_answer(session_id, answer, to).await
            }
            ClientMessage::IceCandidate { candidate, to } => {
                self.handle_ice_candidate(session_id, candidate, to).await
            }
            ClientMessage::CallAccepted => self.handle_call_accepted(session_id).await,
            ClientMessage::CallRejected { reason } => {
                self.handle_call_rejected(session_id, reason).await
            }
            ClientMessage::EndCall => self.handle_end_call(session_id).await,
            ClientMessage::NextPeer => self.handle_next_peer(session_id).await,
            ClientMessage::StatusUpdate { status } => {
                self.handle_status_update(session_id, status).await
            }
            ClientMessage::ReportUser {
                reported_user_id,
                reason,
            } => self.handle_report(session_id, reported_user_id, reason).await,
        }
    }
}
