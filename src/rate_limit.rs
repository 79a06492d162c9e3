use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

use crate::protocol::SessionId;

/// Client actions subject to rate limiting, one counter window per
/// (session, action) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Join,
    Search,
    Offer,
    Answer,
    IceCandidate,
    CallAccepted,
    CallRejected,
    EndCall,
    NextPeer,
    StatusUpdate,
    ReportUser,
}

impl Action {
    pub fn name(self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Search => "search",
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::IceCandidate => "ice-candidate",
            Self::CallAccepted => "call-accepted",
            Self::CallRejected => "call-rejected",
            Self::EndCall => "end-call",
            Self::NextPeer => "next-peer",
            Self::StatusUpdate => "status-update",
            Self::ReportUser => "report-user",
        }
    }

    /// Fixed policy: (max requests, window). Generous enough for legitimate
    /// clients, tight enough to blunt scripted abuse.
    pub fn limit(self) -> (u32, Duration) {
        const MINUTE: Duration = Duration::from_secs(60);
        const HOUR: Duration = Duration::from_secs(3600);
        match self {
            Self::Join => (3, MINUTE),
            Self::Search => (10, MINUTE),
            Self::Offer | Self::Answer => (20, MINUTE),
            Self::IceCandidate => (50, MINUTE),
            Self::CallAccepted | Self::CallRejected | Self::EndCall => (5, MINUTE),
            Self::NextPeer => (3, MINUTE),
            Self::StatusUpdate => (10, MINUTE),
            Self::ReportUser => (2, HOUR),
        }
    }
}

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Hard cap on tracked (session, action) records; exceeding it triggers
    /// an inline compaction pass.
    pub max_records: usize,
    /// Interval for the background eviction sweep.
    pub sweep_interval: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_records: 10_000,
            sweep_interval: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
struct WindowEntry {
    count: u32,
    window_start: Instant,
}

impl WindowEntry {
    fn time_until_reset(&self, window: Duration) -> Duration {
        window.saturating_sub(self.window_start.elapsed())
    }
}

/// Rate limit violation, carried to the client as an `error` event with
/// code `RATE_LIMIT`.
#[derive(Debug, Clone, Error)]
#[error("Rate limit exceeded for `{action}`. Try again in {} seconds.", retry_after.as_secs())]
pub struct RateLimitExceeded {
    pub action: &'static str,
    pub retry_after: Duration,
}

/// Fixed-window counter per (session, action).
///
/// Windows start at the first request after an expiry: the first call resets
/// the counter to 1, subsequent calls within the window increment until the
/// per-action limit denies them.
pub struct ActionRateLimiter {
    config: RateLimiterConfig,
    entries: RwLock<HashMap<(SessionId, Action), WindowEntry>>,
}

impl ActionRateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Check whether `client` may perform `action` now, counting the attempt.
    pub async fn check(
        &self,
        client: SessionId,
        action: Action,
    ) -> Result<(), RateLimitExceeded> {
        let (limit, window) = action.limit();
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        let entry = entries.entry((client, action)).or_insert(WindowEntry {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) >= window {
            entry.count = 1;
            entry.window_start = now;
            return Ok(());
        }

        if entry.count >= limit {
            let retry_after = entry.time_until_reset(window);
            return Err(RateLimitExceeded {
                action: action.name(),
                retry_after,
            });
        }

        entry.count += 1;

        if entries.len() > self.config.max_records {
            Self::compact(&mut entries);
        }

        Ok(())
    }

    /// Drop records whose window expired at least one full window ago.
    /// Called by the periodic sweep task to bound memory.
    pub async fn evict_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        Self::compact(&mut entries);
        let evicted = before - entries.len();
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted expired rate limit records");
        }
        evicted
    }

    /// Forget every record for a disconnected client.
    pub async fn forget_client(&self, client: &SessionId) {
        let mut entries = self.entries.write().await;
        entries.retain(|(id, _), _| id != client);
    }

    pub async fn tracked_records(&self) -> usize {
        self.entries.read().await.len()
    }

    fn compact(entries: &mut HashMap<(SessionId, Action), WindowEntry>) {
        let now = Instant::now();
        entries.retain(|(_, action), entry| {
            let (_, window) = action.limit();
            now.duration_since(entry.window_start) < window * 2
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn limiter() -> ActionRateLimiter {
        ActionRateLimiter::new(RateLimiterConfig::default())
    }

    #[tokio::test]
    async fn allows_exactly_limit_calls_within_window() {
        let limiter = limiter();
        let client = Uuid::new_v4();
        let (limit, _) = Action::Join.limit();

        for _ in 0..limit {
            assert!(limiter.check(client, Action::Join).await.is_ok());
        }
        let err = limiter
            .check(client, Action::Join)
            .await
            .expect_err("limit+1th call must be denied");
        assert_eq!(err.action, "join");
        assert!(err.retry_after <= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn actions_are_limited_independently() {
        let limiter = limiter();
        let client = Uuid::new_v4();

        let (join_limit, _) = Action::Join.limit();
        for _ in 0..join_limit {
            assert!(limiter.check(client, Action::Join).await.is_ok());
        }
        assert!(limiter.check(client, Action::Join).await.is_err());
        // Exhausting join must not affect search
        assert!(limiter.check(client, Action::Search).await.is_ok());
    }

    #[tokio::test]
    async fn clients_are_limited_independently() {
        let limiter = limiter();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let (limit, _) = Action::ReportUser.limit();
        for _ in 0..limit {
            assert!(limiter.check(a, Action::ReportUser).await.is_ok());
        }
        assert!(limiter.check(a, Action::ReportUser).await.is_err());
        assert!(limiter.check(b, Action::ReportUser).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn window_elapse_resets_counter() {
        let limiter = limiter();
        let client = Uuid::new_v4();
        let (limit, window) = Action::NextPeer.limit();

        for _ in 0..limit {
            assert!(limiter.check(client, Action::NextPeer).await.is_ok());
        }
        assert!(limiter.check(client, Action::NextPeer).await.is_err());

        tokio::time::advance(window + Duration::from_millis(1)).await;
        assert!(limiter.check(client, Action::NextPeer).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn eviction_drops_long_expired_records() {
        let limiter = limiter();
        let client = Uuid::new_v4();
        limiter.check(client, Action::Search).await.unwrap();
        assert_eq!(limiter.tracked_records().await, 1);

        let (_, window) = Action::Search.limit();
        tokio::time::advance(window * 2 + Duration::from_secs(1)).await;
        assert_eq!(limiter.evict_expired().await, 1);
        assert_eq!(limiter.tracked_records().await, 0);
    }

    #[tokio::test]
    async fn forget_client_clears_all_records() {
        let limiter = limiter();
        let client = Uuid::new_v4();
        limiter.check(client, Action::Search).await.unwrap();
        limiter.check(client, Action::Offer).await.unwrap();
        assert_eq!(limiter.tracked_records().await, 2);

        limiter.forget_client(&client).await;
        assert_eq!(limiter.tracked_records().await, 0);
    }
}
