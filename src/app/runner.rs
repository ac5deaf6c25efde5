use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::info;

use crate::error::AppResult;
use crate::http::{ClientSettings, HttpClient};
use crate::load::{LoadProfile, spawn_load_controller};
use crate::metrics::{Threshold, metrics_channel, setup_metrics_collector};
use crate::scenario::Scenario;
use crate::shutdown::{setup_signal_shutdown_handler, shutdown_channel};
use crate::vu::{PoolConfig, PoolStats, run_pool};

use super::progress::{ProgressSource, setup_progress_indicator};
use super::summary::{RunSummary, build_summary};

/// Everything one run needs besides the scenario itself.
pub(crate) struct RunSettings {
    pub profile: LoadProfile,
    pub thresholds: Arc<[Threshold]>,
    pub client: ClientSettings,
    pub tick_interval: Duration,
    pub graceful_stop: Duration,
    pub threshold_interval: Duration,
    pub show_progress: bool,
    pub no_color: bool,
}

pub(crate) struct RunOutcome {
    pub summary: RunSummary,
    pub failed_thresholds: usize,
}

/// Runs setup once, then drives the VU pool along the load profile until the
/// last stage ends or a signal arrives.
///
/// # Errors
///
/// Returns an error when setup fails or a run task cannot be joined.
pub(crate) async fn run_scenario<S: Scenario>(
    scenario: Arc<S>,
    settings: RunSettings,
) -> AppResult<RunOutcome> {
    let (metrics, metrics_rx) = metrics_channel();
    let client = HttpClient::new(&settings.client, metrics.clone())?;

    info!(
        "Running setup for scenario '{}' against {}",
        scenario.name(),
        client.base_url()
    );
    let fixture = scenario.setup(&client).await?;

    let max_vus = settings.profile.max_target();
    let total = settings.profile.total_duration();
    info!(
        "Starting {} stages over {:?} with up to {} VUs",
        settings.profile.stages().len(),
        total,
        max_vus
    );

    let run_start = Instant::now();
    let collector = setup_metrics_collector(
        Arc::clone(&settings.thresholds),
        run_start,
        settings.threshold_interval,
        metrics_rx,
    )?;

    let (shutdown_tx, _) = shutdown_channel();
    let signal_handle = setup_signal_shutdown_handler(&shutdown_tx);
    let (target_rx, controller_handle) = spawn_load_controller(
        settings.profile,
        settings.tick_interval,
        run_start,
        &shutdown_tx,
    );

    let stats = Arc::new(PoolStats::default());
    let progress_handle = if settings.show_progress {
        setup_progress_indicator(
            ProgressSource {
                total,
                max_vus,
                stats: Arc::clone(&stats),
            },
            run_start,
            settings.no_color,
            &shutdown_tx,
        )
    } else {
        tokio::spawn(async {})
    };

    let pool_report = run_pool(
        Arc::clone(&scenario),
        fixture,
        client,
        metrics,
        target_rx,
        PoolConfig {
            max_vus,
            graceful_stop: settings.graceful_stop,
        },
        Arc::clone(&stats),
    )
    .await;

    // The controller is done once the pool returns; wake whatever still listens.
    drop(shutdown_tx.send(()));
    let (controller_result, signal_result, progress_result) =
        tokio::join!(controller_handle, signal_handle, progress_handle);
    controller_result?;
    signal_result?;
    progress_result?;

    let report = collector.await?;
    info!(
        "Run finished after {:?}: {} iterations",
        report.elapsed,
        stats.iterations()
    );

    Ok(RunOutcome {
        failed_thresholds: report.failed_thresholds(),
        summary: build_summary(scenario.name(), &report, &pool_report),
    })
}
