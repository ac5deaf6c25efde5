//! Virtual users and the pool that keeps their number on target.
mod pool;
mod random;


use crate::http::HttpClient;
use crate::metrics::MetricsSink;

pub use pool::{PoolConfig, PoolReport, PoolStats, run_pool};
#[cfg(test)]
pub(crate) use random::ScriptedRandom;
pub use random::{RandomSource, ThreadRandom};

/// Ephemeral execution context of one VU activation. Owns its own copy of the
/// setup fixture and its private scenario state; nothing here is shared.
pub struct VirtualUser<F, S> {
    id: u64,
    iteration: u64,
    fixture: F,
    state: S,
    random: Box<dyn RandomSource>,
    client: HttpClient,
    metrics: MetricsSink,
}

impl<F, S> VirtualUser<F, S> {
    #[must_use]
    pub fn new(
        id: u64,
        fixture: F,
        state: S,
        random: Box<dyn RandomSource>,
        client: HttpClient,
        metrics: MetricsSink,
    ) -> Self {
        Self {
            id,
            iteration: 0,
            fixture,
            state,
            random,
            client,
            metrics,
        }
    }

    /// 1-based VU id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Iterations finished by this activation.
    #[must_use]
    pub const fn iteration(&self) -> u64 {
        self.iteration
    }

    #[must_use]
    pub const fn fixture(&self) -> &F {
        &self.fixture
    }

    #[must_use]
    pub const fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    #[must_use]
    pub const fn client(&self) -> &HttpClient {
        &self.client
    }

    pub fn random(&mut self) -> &mut dyn RandomSource {
        self.random.as_mut()
    }

    /// Records a named check. A failed check never aborts the iteration.
    pub fn check(&self, name: &'static str, passed: bool) {
        self.metrics.check(name, passed);
        if !passed {
            tracing::debug!(
                "VU {} iteration {}: check failed: {}",
                self.id,
                self.iteration,
                name
            );
        }
    }

    pub(crate) fn finish_iteration(&mut self) {
        self.iteration = self.iteration.saturating_add(1);
    }
}
