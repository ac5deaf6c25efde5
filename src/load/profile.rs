use std::time::Duration;

use crate::args::LoadStage;
use crate::error::ValidationError;

/// Validated, ordered ramp of virtual-user targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadProfile {
    stages: Vec<LoadStage>,
    total_duration: Duration,
    max_target: u64,
}

impl LoadProfile {
    /// Builds a profile from an ordered stage list.
    ///
    /// # Errors
    ///
    /// Returns an error when the list is empty.
    pub fn new(stages: Vec<LoadStage>) -> Result<Self, ValidationError> {
        if stages.is_empty() {
            return Err(ValidationError::StagesEmpty);
        }
        let total_duration = stages
            .iter()
            .fold(Duration::ZERO, |total, stage| total.saturating_add(stage.duration));
        let max_target = stages.iter().map(|stage| stage.target).max().unwrap_or(0);
        Ok(Self {
            stages,
            total_duration,
            max_target,
        })
    }

    #[must_use]
    pub fn stages(&self) -> &[LoadStage] {
        &self.stages
    }

    #[must_use]
    pub const fn total_duration(&self) -> Duration {
        self.total_duration
    }

    #[must_use]
    pub const fn max_target(&self) -> u64 {
        self.max_target
    }

    /// Index of the stage running at `elapsed`, or `None` once the profile ended.
    #[must_use]
    pub fn stage_index_at(&self, elapsed: Duration) -> Option<usize> {
        self.locate(elapsed).map(|(index, _, _)| index)
    }

    /// Target VU count at `elapsed`, moving linearly from the previous
    /// stage's target (0 before the first stage). `None` once the total
    /// duration has elapsed.
    #[must_use]
    pub fn target_at(&self, elapsed: Duration) -> Option<u64> {
        let (index, stage, into_stage) = self.locate(elapsed)?;
        let start = index
            .checked_sub(1)
            .and_then(|previous| self.stages.get(previous))
            .map_or(0, |previous| previous.target);
        Some(interpolate(start, stage.target, into_stage, stage.duration))
    }

    fn locate(&self, elapsed: Duration) -> Option<(usize, &LoadStage, Duration)> {
        let mut stage_start = Duration::ZERO;
        for (index, stage) in self.stages.iter().enumerate() {
            let stage_end = stage_start.saturating_add(stage.duration);
            if elapsed < stage_end {
                return Some((index, stage, elapsed.saturating_sub(stage_start)));
            }
            stage_start = stage_end;
        }
        None
    }
}

fn interpolate(start: u64, target: u64, into_stage: Duration, stage_duration: Duration) -> u64 {
    let total = stage_duration.as_micros();
    if total == 0 {
        return target;
    }
    let done = into_stage.as_micros().min(total);

    let start_i = i128::from(start);
    let delta = i128::from(target).saturating_sub(start_i);
    let done_i = i128::try_from(done).unwrap_or(i128::MAX);
    let total_i = i128::try_from(total).unwrap_or(i128::MAX);
    let step = delta
        .saturating_mul(done_i)
        .checked_div(total_i)
        .unwrap_or(0);
    let value = start_i.saturating_add(step);
    let low = start.min(target);
    let high = start.max(target);
    u64::try_from(value).unwrap_or(0).clamp(low, high)
}
