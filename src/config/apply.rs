use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::args::{LoadStage, LoadTestArgs, StatusRange};
use crate::error::{AppError, AppResult, ConfigError, ValidationError};
use crate::metrics::Threshold;

use super::types::{ConfigFile, DurationValue, StageConfig};

/// Applies configuration values to CLI arguments. Options given on the command
/// line always win over the file.
///
/// # Errors
///
/// Returns an error when config values are invalid.
pub fn apply_config(
    args: &mut LoadTestArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    if !is_cli(matches, "base_url")
        && let Some(base_url) = config.base_url.clone()
    {
        args.base_url = base_url;
    }

    if !is_cli(matches, "stages")
        && let Some(stages) = config.stages.as_ref()
    {
        args.stages = parse_stages(stages)?;
    }

    if !is_cli(matches, "thresholds")
        && let Some(thresholds) = config.thresholds.as_ref()
    {
        let mut parsed = Vec::new();
        for (metric, expressions) in thresholds {
            for expression in expressions {
                let threshold = Threshold::parse(metric, expression).map_err(|err| {
                    AppError::config(ConfigError::InvalidThreshold {
                        metric: metric.clone(),
                        source: err,
                    })
                })?;
                parsed.push(threshold);
            }
        }
        args.thresholds = parsed;
    }

    if let Some(scenario) = config.scenario.as_ref() {
        if !is_cli(matches, "open_probability")
            && let Some(probability) = scenario.open_probability
        {
            args.open_probability = probability;
        }
        if !is_cli(matches, "close_probability")
            && let Some(probability) = scenario.close_probability
        {
            args.close_probability = probability;
        }
        if !is_cli(matches, "latency_budget")
            && let Some(budget) = scenario.latency_budget.as_ref()
        {
            args.latency_budget = positive(budget, "scenario.latency_budget")?;
        }
        if !is_cli(matches, "city")
            && let Some(city) = scenario.city
        {
            args.city = city;
        }
    }

    if !is_cli(matches, "request_timeout")
        && let Some(timeout) = config.timeout.as_ref()
    {
        args.request_timeout = positive(timeout, "timeout")?;
    }

    if !is_cli(matches, "expected_statuses")
        && let Some(statuses) = config.expected_statuses.as_ref()
    {
        let mut parsed = Vec::with_capacity(statuses.len());
        for status in statuses {
            let range = status.to_text().parse::<StatusRange>().map_err(|err| {
                AppError::config(ConfigError::InvalidField {
                    field: "expected_statuses".to_owned(),
                    source: err,
                })
            })?;
            parsed.push(range);
        }
        args.expected_statuses = parsed;
    }

    if !is_cli(matches, "tick_interval")
        && let Some(interval) = config.tick_interval.as_ref()
    {
        args.tick_interval = positive(interval, "tick_interval")?;
    }

    if !is_cli(matches, "graceful_stop")
        && let Some(graceful_stop) = config.graceful_stop.as_ref()
    {
        args.graceful_stop = graceful_stop
            .to_duration()
            .map_err(|err| invalid_field("graceful_stop", err))?;
    }

    if !is_cli(matches, "threshold_interval")
        && let Some(interval) = config.threshold_interval.as_ref()
    {
        args.threshold_interval = positive(interval, "threshold_interval")?;
    }

    if !is_cli(matches, "summary_export")
        && let Some(path) = config.summary_export.clone()
    {
        args.summary_export = Some(path);
    }

    if !is_cli(matches, "output_format")
        && let Some(format) = config.output_format
    {
        args.output_format = format;
    }

    if !is_cli(matches, "verbose")
        && let Some(verbose) = config.verbose
    {
        args.verbose = verbose;
    }

    if !is_cli(matches, "no_color")
        && let Some(no_color) = config.no_color
    {
        args.no_color = no_color;
    }

    Ok(())
}

fn parse_stages(stages: &[StageConfig]) -> AppResult<Vec<LoadStage>> {
    let mut parsed = Vec::with_capacity(stages.len());
    for (index, stage) in stages.iter().enumerate() {
        let duration = stage.duration.to_duration().map_err(|err| {
            AppError::config(ConfigError::InvalidStageDuration { index, source: err })
        })?;
        let target = u64::try_from(stage.target).map_err(|_err| {
            AppError::config(ConfigError::NegativeStageTarget {
                index,
                target: stage.target,
            })
        })?;
        parsed.push(LoadStage { duration, target });
    }
    if parsed.is_empty() {
        return Err(AppError::config(invalid_field(
            "stages",
            ValidationError::StagesEmpty,
        )));
    }
    Ok(parsed)
}

fn positive(value: &DurationValue, field: &str) -> AppResult<std::time::Duration> {
    value
        .to_positive_duration()
        .map_err(|err| AppError::config(invalid_field(field, err)))
}

fn invalid_field(field: &str, source: ValidationError) -> ConfigError {
    ConfigError::InvalidField {
        field: field.to_owned(),
        source,
    }
}

fn is_cli(matches: &ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(ValueSource::CommandLine)
}
