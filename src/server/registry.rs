use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use crate::protocol::{EndReason, Preferences, SessionId, SessionSnapshot, SessionStatus};

/// Server-side record of one connected client.
#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub id: SessionId,
    pub username: String,
    pub status: SessionStatus,
    pub peer_id: Option<SessionId>,
    pub preferences: Preferences,
    pub joined_at: DateTime<Utc>,
    pub last_activity: Instant,
    pub search_started: Option<Instant>,
}

impl Session {
    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            username: self.username.clone(),
            status: self.status,
            peer_id: self.peer_id,
            preferences: self.preferences.clone(),
            joined_at: self.joined_at,
        }
    }
}

/// Domain events produced by registry mutations. The caller (the server
/// orchestration layer) translates these into outbound client messages;
/// the registry itself never talks to a transport.
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    /// Two sessions were paired and moved to `connecting`.
    Paired {
        a: SessionSnapshot,
        b: SessionSnapshot,
    },
    /// Both sides of a pairing confirmed; the call is live. Informational:
    /// peer discovery already happened at pairing time.
    CallActive {
        session: SessionSnapshot,
        peer: SessionSnapshot,
    },
    /// A connection was torn down. `peer` is absent when the link had
    /// already been severed from the other side.
    Ended {
        session: SessionSnapshot,
        peer: Option<SessionSnapshot>,
        reason: EndReason,
    },
    /// A session sat in the queue past the search deadline and was reset.
    SearchTimedOut { session: SessionSnapshot },
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("session not found")]
    NotFound,
    #[error("cannot start search while {0}")]
    NotIdle(SessionStatus),
}

/// Registry aggregates surfaced by the health endpoint and `queue-status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    pub total_users: usize,
    pub users_searching: usize,
    /// Number of active calls (pairs, not endpoints)
    pub users_in_call: usize,
}

#[derive(Default)]
pub(crate) struct RegistryState {
    pub sessions: HashMap<SessionId, Session>,
    /// Ids eligible for pairing. Membership implies status == Searching;
    /// stale entries are pruned at the start of every matching pass.
    pub queue: HashSet<SessionId>,
}

/// Authoritative owner of all session state and the matching queue.
///
/// Every mutation runs under one mutex, giving the single sequential
/// timeline the peer-link invariant depends on: `peer_id` is set iff the
/// status is `connecting` or `in_call`, and peer links are reciprocal.
/// Other components never touch the maps directly.
pub struct SessionRegistry {
    state: Mutex<RegistryState>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Register a session. Idempotent: re-adding an existing id returns the
    /// current record untouched.
    pub async fn add_session(
        &self,
        id: SessionId,
        username: String,
        preferences: Preferences,
    ) -> (SessionSnapshot, bool) {
        let mut state = self.state.lock().await;
        if let Some(existing) = state.sessions.get(&id) {
            tracing::warn!(session_id = %id, "Attempted to add existing session");
            return (existing.snapshot(), false);
        }

        let session = Session {
            id,
            username,
            status: SessionStatus::Idle,
            peer_id: None,
            preferences,
            joined_at: Utc::now(),
            last_activity: Instant::now(),
            search_started: None,
        };
        let snapshot = session.snapshot();
        state.sessions.insert(id, session);
        tracing::info!(session_id = %id, username = %snapshot.username, "Session added");
        (snapshot, true)
    }

    /// Remove a session, severing any peer link first so the peer is left in
    /// a consistent idle state. Returns the removed snapshot together with
    /// the teardown events to deliver.
    pub async fn remove_session(
        &self,
        id: &SessionId,
    ) -> Option<(SessionSnapshot, Vec<RegistryEvent>)> {
        self.remove_session_with_reason(id, EndReason::UserDisconnected)
            .await
    }

    pub(crate) async fn remove_session_with_reason(
        &self,
        id: &SessionId,
        reason: EndReason,
    ) -> Option<(SessionSnapshot, Vec<RegistryEvent>)> {
        let mut state = self.state.lock().await;
        if !state.sessions.contains_key(id) {
            return None;
        }

        let mut events = Vec::new();
        if let Some(event) = end_connection_locked(&mut state, id, reason) {
            events.push(event);
        }

        state.queue.remove(id);
        let session = state.sessions.remove(id)?;
        tracing::info!(session_id = %id, username = %session.username, "Session removed");
        Some((session.snapshot(), events))
    }

    /// Refresh `last_activity`.
    pub async fn touch(&self, id: &SessionId) -> bool {
        let mut state = self.state.lock().await;
        match state.sessions.get_mut(id) {
            Some(session) => {
                session.last_activity = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Externally driven status change. Only `idle` and `searching` are
    /// accepted, and never for a session holding a peer link; anything else
    /// is a no-op. Searching enqueues with a fresh `search_started`, idle
    /// dequeues, so queue membership always tracks the status.
    pub async fn update_status(&self, id: &SessionId, status: SessionStatus) -> bool {
        if status.requires_peer() {
            return false;
        }
        let mut state = self.state.lock().await;
        let Some(session) = state.sessions.get_mut(id) else {
            return false;
        };
        if session.peer_id.is_some() || session.status.requires_peer() {
            return false;
        }

        session.status = status;
        session.last_activity = Instant::now();
        match status {
            SessionStatus::Searching => {
                session.search_started = Some(Instant::now());
                state.queue.insert(*id);
            }
            _ => {
                session.search_started = None;
                state.queue.remove(id);
            }
        }
        true
    }

    /// Enter the matching queue. Valid only from `idle`.
    pub async fn start_searching(&self, id: &SessionId) -> Result<(), RegistryError> {
        let mut state = self.state.lock().await;
        let Some(session) = state.sessions.get_mut(id) else {
            return Err(RegistryError::NotFound);
        };
        if session.status != SessionStatus::Idle {
            return Err(RegistryError::NotIdle(session.status));
        }

        session.status = SessionStatus::Searching;
        session.search_started = Some(Instant::now());
        session.last_activity = Instant::now();
        tracing::info!(session_id = %id, username = %session.username, "Session started searching");
        state.queue.insert(*id);
        Ok(())
    }

    /// Pair two sessions. Both must still exist and be idle or searching;
    /// anything else means the snapshot that proposed the pair went stale
    /// and the pairing is refused.
    pub async fn create_connection(
        &self,
        a: &SessionId,
        b: &SessionId,
    ) -> Option<RegistryEvent> {
        let mut state = self.state.lock().await;
        create_connection_locked(&mut state, a, b)
    }

    /// Flip one side of a `connecting` pair to `in_call`. Emits `CallActive`
    /// once both sides have confirmed.
    pub async fn activate_connection(&self, id: &SessionId) -> Option<RegistryEvent> {
        let mut state = self.state.lock().await;
        let session = state.sessions.get_mut(id)?;
        if session.status != SessionStatus::Connecting {
            return None;
        }
        session.status = SessionStatus::InCall;
        session.last_activity = Instant::now();
        let snapshot = session.snapshot();
        let peer_id = session.peer_id?;

        let peer = state.sessions.get(&peer_id)?;
        if peer.status == SessionStatus::InCall {
            tracing::info!(
                session = %snapshot.username,
                peer = %peer.username,
                "Call is now active for both sessions"
            );
            return Some(RegistryEvent::CallActive {
                session: snapshot,
                peer: peer.snapshot(),
            });
        }
        None
    }

    /// Tear down a connection from either side. Idempotent: ending a session
    /// that holds no peer link is a no-op, not an error.
    pub async fn end_connection(
        &self,
        id: &SessionId,
        reason: EndReason,
    ) -> Option<RegistryEvent> {
        let mut state = self.state.lock().await;
        end_connection_locked(&mut state, id, reason)
    }

    pub async fn get(&self, id: &SessionId) -> Option<SessionSnapshot> {
        let state = self.state.lock().await;
        state.sessions.get(id).map(Session::snapshot)
    }

    /// Current peer link, if any.
    pub async fn peer_of(&self, id: &SessionId) -> Option<SessionId> {
        let state = self.state.lock().await;
        state.sessions.get(id).and_then(|s| s.peer_id)
    }

    pub async fn contains(&self, id: &SessionId) -> bool {
        let state = self.state.lock().await;
        state.sessions.contains_key(id)
    }

    pub async fn stats(&self) -> RegistryStats {
        let state = self.state.lock().await;
        let in_call_endpoints = state
            .sessions
            .values()
            .filter(|s| s.status == SessionStatus::InCall && s.peer_id.is_some())
            .count();
        RegistryStats {
            total_users: state.sessions.len(),
            users_searching: state.queue.len(),
            // Each call involves two endpoints
            users_in_call: in_call_endpoints / 2,
        }
    }

    /// Evict idle sessions and reset stuck searches. Returns the events to
    /// deliver. Runs as one sweep so a session evicted here can't be acted
    /// on by a half-finished pass elsewhere.
    pub async fn run_cleanup_pass(
        &self,
        idle_timeout: Duration,
        search_timeout: Duration,
    ) -> Vec<RegistryEvent> {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        let mut events = Vec::new();

        let expired: Vec<SessionId> = state
            .sessions
            .values()
            .filter(|s| now.duration_since(s.last_activity) > idle_timeout)
            .map(|s| s.id)
            .collect();
        for id in expired {
            // Re-read: a prior eviction in this loop may have already
            // unwound this session's peer link.
            if let Some(event) = end_connection_locked(&mut state, &id, EndReason::ConnectionTimeout)
            {
                events.push(event);
            }
            state.queue.remove(&id);
            if let Some(session) = state.sessions.remove(&id) {
                tracing::info!(
                    session_id = %id,
                    username = %session.username,
                    "Evicted inactive session"
                );
            }
        }

        let timed_out: Vec<SessionId> = state
            .sessions
            .values()
            .filter(|s| {
                s.status == SessionStatus::Searching
                    && s.search_started
                        .is_some_and(|started| now.duration_since(started) > search_timeout)
            })
            .map(|s| s.id)
            .collect();
        for id in timed_out {
            state.queue.remove(&id);
            if let Some(session) = state.sessions.get_mut(&id) {
                session.status = SessionStatus::Idle;
                session.search_started = None;
                tracing::info!(
                    session_id = %id,
                    username = %session.username,
                    "Reset stuck search"
                );
                events.push(RegistryEvent::SearchTimedOut {
                    session: session.snapshot(),
                });
            }
        }

        events
    }

    pub(crate) async fn lock_state(&self) -> tokio::sync::MutexGuard<'_, RegistryState> {
        self.state.lock().await
    }

    /// Verify the peer-link invariant over the whole registry. Test-only.
    #[cfg(test)]
    pub(crate) async fn assert_invariants(&self) {
        let state = self.state.lock().await;
        for session in state.sessions.values() {
            assert_eq!(
                session.peer_id.is_some(),
                session.status.requires_peer(),
                "session {} has status {} with peer {:?}",
                session.id,
                session.status,
                session.peer_id
            );
            if let Some(peer_id) = session.peer_id {
                let peer = state
                    .sessions
                    .get(&peer_id)
                    .unwrap_or_else(|| panic!("session {} references dead peer", session.id));
                assert_eq!(
                    peer.peer_id,
                    Some(session.id),
                    "peer link between {} and {} is not reciprocal",
                    session.id,
                    peer_id
                );
            }
        }
        for id in &state.queue {
            let session = state
                .sessions
                .get(id)
                .unwrap_or_else(|| panic!("queue references dead session {id}"));
            assert_eq!(session.status, SessionStatus::Searching);
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Pair two sessions under the already-held registry lock.
pub(crate) fn create_connection_locked(
    state: &mut RegistryState,
    a: &SessionId,
    b: &SessionId,
) -> Option<RegistryEvent> {
    if a == b {
        return None;
    }
    let eligible = |status: SessionStatus| {
        matches!(status, SessionStatus::Idle | SessionStatus::Searching)
    };
    if !state.sessions.get(a).map(|s| s.status).is_some_and(eligible)
        || !state.sessions.get(b).map(|s| s.status).is_some_and(eligible)
    {
        return None;
    }

    let now = Instant::now();
    let snap_a = {
        // Both lookups verified above
        let session = state.sessions.get_mut(a)?;
        session.status = SessionStatus::Connecting;
        session.peer_id = Some(*b);
        session.search_started = None;
        session.last_activity = now;
        session.snapshot()
    };
    let snap_b = {
        let session = state.sessions.get_mut(b)?;
        session.status = SessionStatus::Connecting;
        session.peer_id = Some(*a);
        session.search_started = None;
        session.last_activity = now;
        session.snapshot()
    };

    state.queue.remove(a);
    state.queue.remove(b);

    tracing::info!(a = %snap_a.username, b = %snap_b.username, "Connection created");
    Some(RegistryEvent::Paired {
        a: snap_a,
        b: snap_b,
    })
}

/// Tear down a connection under the already-held registry lock. The peer is
/// only reset when its link still points back at `id`; a peer that already
/// moved on is left alone.
pub(crate) fn end_connection_locked(
    state: &mut RegistryState,
    id: &SessionId,
    reason: EndReason,
) -> Option<RegistryEvent> {
    let session = state.sessions.get_mut(id)?;
    if !session.status.requires_peer() {
        return None;
    }

    let now = Instant::now();
    let peer_id = session.peer_id.take();
    session.status = SessionStatus::Idle;
    session.search_started = None;
    session.last_activity = now;
    let snapshot = session.snapshot();

    let peer_snapshot = peer_id.and_then(|pid| {
        let peer = state.sessions.get_mut(&pid)?;
        if peer.peer_id != Some(*id) {
            return None;
        }
        peer.peer_id = None;
        peer.status = SessionStatus::Idle;
        peer.search_started = None;
        peer.last_activity = now;
        Some(peer.snapshot())
    });

    tracing::info!(
        session = %snapshot.username,
        peer = peer_snapshot.as_ref().map(|p| p.username.as_str()).unwrap_or("-"),
        reason = %reason,
        "Connection ended"
    );
    Some(RegistryEvent::Ended {
        session: snapshot,
        peer: peer_snapshot,
        reason,
    })
}
