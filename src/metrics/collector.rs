use std::sync::Arc;
use std::time::Duration;

use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};

use crate::error::{AppError, AppResult};

use super::registry::MetricsRegistry;
use super::thresholds::{Threshold, ThresholdOutcome, Verdict, evaluate_all};
use super::types::MetricEvent;

/// Everything the collector knows once the last sink is dropped.
#[derive(Debug)]
pub struct MetricsReport {
    pub registry: MetricsRegistry,
    pub elapsed: Duration,
    pub outcomes: Vec<ThresholdOutcome>,
}

impl MetricsReport {
    #[must_use]
    pub fn failed_thresholds(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.verdict.is_failed())
            .count()
    }
}

/// Spawns the single task that folds every sample into the registry. It
/// re-evaluates thresholds every `check_interval`, logging verdict changes,
/// and finishes with a final evaluation when every sender is gone.
///
/// # Errors
///
/// Returns an error if the registry histograms cannot be allocated.
pub fn setup_metrics_collector(
    thresholds: Arc<[Threshold]>,
    run_start: Instant,
    check_interval: Duration,
    mut metrics_rx: mpsc::UnboundedReceiver<MetricEvent>,
) -> AppResult<JoinHandle<MetricsReport>> {
    let mut registry = MetricsRegistry::new().map_err(AppError::metrics)?;

    Ok(tokio::spawn(async move {
        let mut verdicts = vec![Verdict::NoData; thresholds.len()];
        let first_check = run_start.checked_add(check_interval).unwrap_or(run_start);
        let mut check_timer = tokio::time::interval_at(first_check, check_interval);
        check_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut record_errors: u64 = 0;

        loop {
            tokio::select! {
                maybe_event = metrics_rx.recv() => {
                    let Some(event) = maybe_event else {
                        break;
                    };
                    if let Err(err) = registry.record(event) {
                        record_errors = record_errors.saturating_add(1);
                        if record_errors == 1 {
                            tracing::warn!("Dropping metric sample: {}", err);
                        }
                    }
                }
                _ = check_timer.tick() => {
                    let outcomes = evaluate_all(&thresholds, &registry, run_start.elapsed());
                    log_verdict_changes(&outcomes, &mut verdicts);
                }
            }
        }

        if record_errors > 1 {
            tracing::warn!("{} metric samples could not be recorded", record_errors);
        }

        let elapsed = run_start.elapsed();
        let outcomes = evaluate_all(&thresholds, &registry, elapsed);
        MetricsReport {
            registry,
            elapsed,
            outcomes,
        }
    }))
}

fn log_verdict_changes(outcomes: &[ThresholdOutcome], verdicts: &mut [Verdict]) {
    for (outcome, previous) in outcomes.iter().zip(verdicts.iter_mut()) {
        if outcome.verdict == *previous {
            continue;
        }
        let observed = outcome
            .observed
            .map_or_else(|| "no data".to_owned(), |value| value.to_string());
        match outcome.verdict {
            Verdict::Failed => {
                tracing::warn!(
                    "Threshold crossed: {} (observed {})",
                    outcome.threshold,
                    observed
                );
            }
            Verdict::Passed => {
                tracing::info!(
                    "Threshold passing: {} (observed {})",
                    outcome.threshold,
                    observed
                );
            }
            Verdict::NoData => {}
        }
        *previous = outcome.verdict;
    }
}
