use std::sync::Arc;

use crate::app::RunSettings;
use crate::args::{LoadTestArgs, default_stages, default_thresholds};
use crate::error::{AppError, AppResult};
use crate::http::{ClientSettings, parse_base_url};
use crate::load::LoadProfile;
use crate::scenario::PvzSettings;

use super::types::RunPlan;

/// Fills in defaults and validates everything that can fail before setup.
///
/// # Errors
///
/// Returns an error when the base URL or the stage list is invalid.
pub(crate) fn build_plan(args: LoadTestArgs) -> AppResult<RunPlan> {
    parse_base_url(&args.base_url)?;

    let stages = if args.stages.is_empty() {
        default_stages()
    } else {
        args.stages
    };
    let profile = LoadProfile::new(stages).map_err(AppError::validation)?;

    let thresholds = if args.thresholds.is_empty() {
        default_thresholds()
    } else {
        args.thresholds
    };
    for threshold in &thresholds {
        tracing::debug!("Threshold {}", threshold);
    }

    Ok(RunPlan {
        run: RunSettings {
            profile,
            thresholds: Arc::from(thresholds),
            client: ClientSettings {
                base_url: args.base_url,
                timeout: args.request_timeout,
                expected_statuses: args.expected_statuses,
            },
            tick_interval: args.tick_interval,
            graceful_stop: args.graceful_stop,
            threshold_interval: args.threshold_interval,
            show_progress: !args.verbose,
            no_color: args.no_color,
        },
        scenario: PvzSettings {
            open_probability: args.open_probability,
            close_probability: args.close_probability,
            latency_budget: args.latency_budget,
            city: args.city,
        },
        summary_export: args.summary_export,
        output_format: args.output_format,
        no_color: args.no_color,
    })
}
