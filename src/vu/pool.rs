use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::http::HttpClient;
use crate::metrics::MetricsSink;
use crate::scenario::Scenario;

use super::VirtualUser;
use super::random::ThreadRandom;

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// Slots spawned up front; the profile's highest target.
    pub max_vus: u64,
    /// How long in-flight iterations may run once the target channel closes.
    pub graceful_stop: Duration,
}

/// Live counters read by the progress line.
#[derive(Debug, Default)]
pub struct PoolStats {
    active: AtomicU64,
    iterations: AtomicU64,
}

impl PoolStats {
    #[must_use]
    pub fn active(&self) -> u64 {
        self.active.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolReport {
    pub max_vus: u64,
    /// Iterations still running when the graceful stop ran out.
    pub interrupted: u64,
}

struct Slot<S: Scenario> {
    index: u64,
    max_vus: u64,
    scenario: Arc<S>,
    fixture: S::Fixture,
    client: HttpClient,
    metrics: MetricsSink,
    stats: Arc<PoolStats>,
}

/// Runs the VU pool until the target channel closes. Slot `i` is active while
/// `i < target`; activation builds a fresh [`VirtualUser`], retirement only
/// happens between iterations.
pub async fn run_pool<S: Scenario>(
    scenario: Arc<S>,
    fixture: S::Fixture,
    client: HttpClient,
    metrics: MetricsSink,
    mut target_rx: watch::Receiver<u64>,
    config: PoolConfig,
    stats: Arc<PoolStats>,
) -> PoolReport {
    metrics.vus(0, config.max_vus);
    let mut handles: Vec<JoinHandle<()>> = (0..config.max_vus)
        .map(|index| {
            let slot = Slot {
                index,
                max_vus: config.max_vus,
                scenario: Arc::clone(&scenario),
                fixture: fixture.clone(),
                client: client.clone(),
                metrics: metrics.clone(),
                stats: Arc::clone(&stats),
            };
            tokio::spawn(run_slot(slot, target_rx.clone()))
        })
        .collect();
    tracing::debug!("Spawned {} VU slots", config.max_vus);

    while target_rx.changed().await.is_ok() {}

    let in_flight = stats.active();
    if in_flight > 0 {
        tracing::info!(
            "Waiting up to {:?} for {} in-flight iterations",
            config.graceful_stop,
            in_flight
        );
    }

    let finished = tokio::time::timeout(
        config.graceful_stop,
        join_all(handles.iter_mut()),
    )
    .await
    .is_ok();

    let mut interrupted: u64 = 0;
    if !finished {
        // Slots still counted active are mid-iteration; idle ones exit on their own.
        interrupted = stats.active();
        for handle in handles.iter().filter(|handle| !handle.is_finished()) {
            handle.abort();
        }
        if interrupted > 0 {
            tracing::warn!(
                "Graceful stop elapsed; interrupted {} iterations",
                interrupted
            );
        }
    }
    metrics.vus(0, config.max_vus);

    PoolReport {
        max_vus: config.max_vus,
        interrupted,
    }
}

async fn run_slot<S: Scenario>(slot: Slot<S>, mut target_rx: watch::Receiver<u64>) {
    loop {
        if !wait_for_activation(slot.index, &mut target_rx).await {
            return;
        }

        let activated = slot
            .stats
            .active
            .fetch_add(1, Ordering::Relaxed)
            .saturating_add(1);
        slot.metrics.vus(activated, slot.max_vus);
        let id = slot.index.saturating_add(1);
        tracing::debug!("VU {} started", id);

        let mut vu = VirtualUser::new(
            id,
            slot.fixture.clone(),
            S::State::default(),
            Box::new(ThreadRandom::from_entropy()),
            slot.client.clone(),
            slot.metrics.clone(),
        );

        let closed = loop {
            let started = Instant::now();
            slot.scenario.iteration(&mut vu).await;
            slot.metrics.iteration(started.elapsed());
            slot.stats.iterations.fetch_add(1, Ordering::Relaxed);
            vu.finish_iteration();

            let closed = target_rx.has_changed().is_err();
            if closed || slot.index >= *target_rx.borrow() {
                break closed;
            }
        };

        let remaining = slot
            .stats
            .active
            .fetch_sub(1, Ordering::Relaxed)
            .saturating_sub(1);
        slot.metrics.vus(remaining, slot.max_vus);
        tracing::debug!("VU {} retired after {} iterations", id, vu.iteration());

        if closed {
            return;
        }
    }
}

/// Waits until this slot is inside the target. `false` once the channel closed.
async fn wait_for_activation(index: u64, target_rx: &mut watch::Receiver<u64>) -> bool {
    loop {
        if index < *target_rx.borrow_and_update() {
            return true;
        }
        if target_rx.changed().await.is_err() {
            return false;
        }
    }
}
