use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::args::{City, NumberOrText, OutputFormat, Probability};
use crate::error::ValidationError;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub base_url: Option<String>,
    pub stages: Option<Vec<StageConfig>>,
    /// Metric selector to threshold expressions, e.g. `http_req_duration = ["p(95)<100"]`.
    pub thresholds: Option<BTreeMap<String, Vec<String>>>,
    pub scenario: Option<ScenarioConfig>,
    pub timeout: Option<DurationValue>,
    pub expected_statuses: Option<Vec<StatusValue>>,
    pub tick_interval: Option<DurationValue>,
    pub graceful_stop: Option<DurationValue>,
    pub threshold_interval: Option<DurationValue>,
    pub summary_export: Option<String>,
    pub output_format: Option<OutputFormat>,
    pub verbose: Option<bool>,
    pub no_color: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageConfig {
    pub duration: DurationValue,
    pub target: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    pub open_probability: Option<Probability>,
    pub close_probability: Option<Probability>,
    pub latency_budget: Option<DurationValue>,
    pub city: Option<City>,
}

/// Durations may be written as bare seconds (`30`) or with a unit (`"250ms"`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self) -> Result<Duration, ValidationError> {
        match self {
            DurationValue::Seconds(secs) => Ok(Duration::from_secs(*secs)),
            DurationValue::Text(text) => super::parse_duration_value(text),
        }
    }

    pub(crate) fn to_positive_duration(&self) -> Result<Duration, ValidationError> {
        let duration = self.to_duration()?;
        if duration.is_zero() {
            return Err(ValidationError::DurationZero);
        }
        Ok(duration)
    }
}

/// Expected statuses may be written as `201` or `"200-399"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct StatusValue(NumberOrText);

impl StatusValue {
    pub(crate) fn to_text(&self) -> String {
        self.0.to_text()
    }
}
