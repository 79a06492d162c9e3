use tokio::time::Instant;

use crate::protocol::SessionStatus;

use super::registry::{create_connection_locked, RegistryEvent, Session, SessionRegistry};

impl SessionRegistry {
    /// One matching pass over the queue: prune stale entries, order the
    /// remaining candidates oldest search first, then greedily pair each
    /// unmatched candidate with the first compatible one after it. Runs
    /// entirely under the registry lock so no candidate can change state
    /// mid-pass.
    pub async fn run_matching_pass(&self) -> Vec<RegistryEvent> {
        let mut state = self.lock_state().await;

        // Entries whose session left or stopped searching since enqueue.
        {
            let super::registry::RegistryState { sessions, queue } = &mut *state;
            queue.retain(|id| {
                sessions
                    .get(id)
                    .is_some_and(|s| s.status == SessionStatus::Searching)
            });
        }

        let now = Instant::now();
        let mut candidates: Vec<(crate::protocol::SessionId, Instant)> = state
            .queue
            .iter()
            .map(|id| {
                let started = state
                    .sessions
                    .get(id)
                    .and_then(|s| s.search_started)
                    .unwrap_or(now);
                (*id, started)
            })
            .collect();
        if candidates.len() < 2 {
            return Vec::new();
        }
        candidates.sort_by_key(|(_, started)| *started);

        let mut events = Vec::new();
        let mut matched = vec![false; candidates.len()];
        for i in 0..candidates.len() {
            if matched[i] {
                continue;
            }
            for j in (i + 1)..candidates.len() {
                if matched[j] {
                    continue;
                }
                let (a, b) = (candidates[i].0, candidates[j].0);
                let compatible = match (state.sessions.get(&a), state.sessions.get(&b)) {
                    (Some(sa), Some(sb)) => can_match(sa, sb),
                    _ => false,
                };
                if !compatible {
                    continue;
                }
                if let Some(event) = create_connection_locked(&mut state, &a, &b) {
                    matched[i] = true;
                    matched[j] = true;
                    events.push(event);
                }
                break;
            }
        }
        events
    }
}

/// Preference compatibility. Symmetric by construction: each rule reads both
/// sides the same way.
///
/// Declared languages must match exactly; an undeclared language on either
/// side is a wildcard. When both sides declare interests, at least one must
/// be shared; an empty list matches anyone.
pub(crate) fn can_match(a: &Session, b: &Session) -> bool {
    if a.id == b.id {
        return false;
    }
    if a.status != SessionStatus::Searching || b.status != SessionStatus::Searching {
        return false;
    }

    if let (Some(lang_a), Some(lang_b)) = (&a.preferences.language, &b.preferences.language) {
        if lang_a != lang_b {
            return false;
        }
    }

    let interests_a = &a.preferences.interests;
    let interests_b = &b.preferences.interests;
    if !interests_a.is_empty() && !interests_b.is_empty() {
        return interests_a.iter().any(|i| interests_b.contains(i));
    }

    true
}
