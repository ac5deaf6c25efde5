use std::time::Duration;

use super::types::{LoadStage, StatusRange};
use crate::config::{parse_duration_value, parse_positive_duration};
use crate::error::ValidationError;
use crate::metrics::Threshold;

pub(crate) fn parse_duration_arg(s: &str) -> Result<Duration, ValidationError> {
    parse_positive_duration(s)
}

pub(crate) fn parse_non_negative_duration_arg(s: &str) -> Result<Duration, ValidationError> {
    parse_duration_value(s)
}

/// Parses `duration:target`, e.g. `30s:1000` or `5m:1000`.
pub(crate) fn parse_stage(s: &str) -> Result<LoadStage, ValidationError> {
    let (duration_text, target_text) =
        s.rsplit_once(':')
            .ok_or_else(|| ValidationError::InvalidStageFormat {
                value: s.to_owned(),
            })?;
    let duration = parse_duration_value(duration_text)?;
    let target = parse_stage_target(target_text)?;
    Ok(LoadStage { duration, target })
}

pub(crate) fn parse_stage_target(s: &str) -> Result<u64, ValidationError> {
    let trimmed = s.trim();
    if trimmed.starts_with('-') {
        return Err(ValidationError::NegativeStageTarget {
            value: trimmed.to_owned(),
        });
    }
    trimmed
        .parse::<u64>()
        .map_err(|err| ValidationError::InvalidStageTarget {
            value: trimmed.to_owned(),
            source: err,
        })
}

pub(crate) fn parse_threshold_arg(s: &str) -> Result<Threshold, ValidationError> {
    s.parse::<Threshold>()
}

pub(crate) fn parse_status_range(s: &str) -> Result<StatusRange, ValidationError> {
    s.parse::<StatusRange>()
}
