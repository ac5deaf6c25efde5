use std::time::Duration;

use crate::metrics::Threshold;

use super::types::LoadStage;

pub(crate) const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub(crate) const DEFAULT_USER_AGENT: &str = concat!("pvzload/", env!("CARGO_PKG_VERSION"));

/// Thirty-second ramp to 1000 VUs, five minutes of hold, thirty-second ramp down.
pub(crate) fn default_stages() -> Vec<LoadStage> {
    vec![
        LoadStage {
            duration: Duration::from_secs(30),
            target: 1000,
        },
        LoadStage {
            duration: Duration::from_secs(300),
            target: 1000,
        },
        LoadStage {
            duration: Duration::from_secs(30),
            target: 0,
        },
    ]
}

/// 95th percentile below 100ms and fewer than 0.01% failed requests.
pub(crate) fn default_thresholds() -> Vec<Threshold> {
    ["http_req_duration: p(95)<100", "http_req_failed: rate<0.0001"]
        .iter()
        .filter_map(|text| text.parse::<Threshold>().ok())
        .collect()
}
