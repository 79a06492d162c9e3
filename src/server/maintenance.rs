use tokio::time::interval;

use super::PairServer;

impl PairServer {
    /// One matching pass plus delivery of the resulting pairings. Exposed
    /// separately from the loop so tests can drive matching deterministically.
    pub async fn run_matching_pass_and_dispatch(&self) {
        let events = self.registry.run_matching_pass().await;
        if !events.is_empty() {
            tracing::debug!(pairs = events.len(), "Matching pass produced pairings");
        }
        self.dispatch_events(events);
    }

    /// One cleanup sweep: idle eviction and stuck-search reset. Rate-limit
    /// records are evicted by [`Self::sweep_task`] on its own interval.
    pub async fn run_cleanup_pass(&self) {
        let events = self
            .registry
            .run_cleanup_pass(self.config.idle_timeout, self.config.search_timeout)
            .await;
        self.dispatch_events(events);
    }

    /// Periodic matching loop. Runs until the server is dropped.
    pub async fn matching_task(&self) {
        let mut ticker = interval(self.config.matching_interval);
        loop {
            ticker.tick().await;
            self.run_matching_pass_and_dispatch().await;
        }
    }

    /// Periodic cleanup loop. Runs until the server is dropped.
    pub async fn cleanup_task(&self) {
        let mut ticker = interval(self.config.cleanup_interval);
        loop {
            ticker.tick().await;
            self.run_cleanup_pass().await;
        }
    }

    /// Periodic rate-limit record eviction, on its own configured interval.
    pub async fn sweep_task(&self) {
        let mut ticker = interval(self.config.rate_limiter.sweep_interval);
        loop {
            ticker.tick().await;
            self.rate_limiter.evict_expired().await;
        }
    }
}
