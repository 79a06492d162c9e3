use crate::protocol::{
    validation, EndReason, ServerMessage, SessionId, SessionStatus,
};

use super::PairServer;

impl PairServer {
    /// Create the session record for a connected socket. The username is
    /// validated strictly (join fails on a bad one); preferences are
    /// sanitized leniently and never block the join.
    pub(super) async fn handle_join(
        &self,
        session_id: &SessionId,
        username: String,
        preferences: Option<serde_json::Value>,
    ) {
        let username = match validation::validate_username_with_config(
            &username,
            &self.protocol_config,
        ) {
            Ok(username) => username,
            Err(message) => {
                tracing::warn!(session_id = %session_id, %message, "Join rejected");
                self.send_to_session(session_id, ServerMessage::JoinError { message });
                return;
            }
        };
        let preferences = validation::sanitize_preferences_with_config(
            preferences.as_ref(),
            &self.protocol_config,
        );

        let (session, _created) = self
            .registry
            .add_session(*session_id, username, preferences)
            .await;
        self.send_to_session(session_id, ServerMessage::JoinSuccess { session });
    }

    pub(super) async fn handle_search(&self, session_id: &SessionId) {
        match self.registry.start_searching(session_id).await {
            Ok(()) => {
                self.send_to_session(session_id, ServerMessage::SearchStarted);
                self.send_queue_status(session_id).await;
            }
            Err(err) => {
                tracing::warn!(session_id = %session_id, error = %err, "Search rejected");
                self.send_to_session(
                    session_id,
                    ServerMessage::SearchError {
                        message: format!("Cannot start search: {err}"),
                    },
                );
            }
        }
    }

    pub(super) async fn handle_end_call(&self, session_id: &SessionId) {
        if let Some(event) = self
            .registry
            .end_connection(session_id, EndReason::UserEnded)
            .await
        {
            self.dispatch_events(vec![event]);
        }
    }

    /// End the current call and immediately re-enter the queue.
    pub(super) async fn handle_next_peer(&self, session_id: &SessionId) {
        if let Some(event) = self
            .registry
            .end_connection(session_id, EndReason::NextPeer)
            .await
        {
            self.dispatch_events(vec![event]);
        }
        match self.registry.start_searching(session_id).await {
            Ok(()) => {
                self.send_to_session(session_id, ServerMessage::SearchStarted);
                self.send_queue_status(session_id).await;
            }
            Err(err) => {
                tracing::warn!(session_id = %session_id, error = %err, "Re-search after next-peer failed");
                self.send_to_session(
                    session_id,
                    ServerMessage::SearchError {
                        message: format!("Cannot start search: {err}"),
                    },
                );
            }
        }
    }

    /// Client-driven status change, restricted to `idle` and `searching`.
    /// Unknown or peer-holding statuses are dropped after a warning.
    pub(super) async fn handle_status_update(&self, session_id: &SessionId, status: String) {
        let parsed = match status.as_str() {
            "idle" => SessionStatus::Idle,
            "searching" => SessionStatus::Searching,
            other => {
                tracing::warn!(session_id = %session_id, status = other, "Ignoring status update");
                return;
            }
        };
        if !self.registry.update_status(session_id, parsed).await {
            tracing::warn!(session_id = %session_id, status = %parsed, "Status update refused");
        }
    }

    pub(super) async fn send_queue_status(&self, session_id: &SessionId) {
        let stats = self.registry.stats().await;
        self.send_to_session(
            session_id,
            ServerMessage::QueueStatus {
                position: stats.users_searching,
                estimated_wait: stats.users_searching as u64 * self.config.wait_estimate_per_user,
                active_users: stats.total_users,
            },
        );
    }
}
