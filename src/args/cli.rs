use clap::Parser;
use std::time::Duration;

use crate::metrics::Threshold;

use super::defaults::DEFAULT_BASE_URL;
use super::parsers::{
    parse_duration_arg, parse_non_negative_duration_arg, parse_stage, parse_status_range,
    parse_threshold_arg,
};
use super::types::{City, LoadStage, OutputFormat, Probability, StatusRange};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Ramping virtual-user load test for the PVZ pickup-point API: reception lifecycle checks under load, with p95/failure-rate thresholds."
)]
pub struct LoadTestArgs {
    /// Path to a TOML or JSON config file (defaults to ./pvzload.toml or ./pvzload.json)
    #[arg(long, short = 'c')]
    pub config: Option<String>,

    /// Base URL of the PVZ service
    #[arg(long = "base-url", short = 'u', env = "PVZLOAD_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Ramp stage as 'duration:target' (repeatable, e.g. --stage 30s:1000 --stage 5m:1000)
    #[arg(long = "stage", short = 's', value_parser = parse_stage)]
    pub stages: Vec<LoadStage>,

    /// Threshold as 'metric: expression' (repeatable, e.g. 'http_req_duration: p(95)<100')
    #[arg(long = "threshold", value_parser = parse_threshold_arg)]
    pub thresholds: Vec<Threshold>,

    /// Probability of opening a reception when none is open
    #[arg(long = "open-probability", default_value = "0.10")]
    pub open_probability: Probability,

    /// Probability of closing the open reception after adding a product
    #[arg(long = "close-probability", default_value = "0.05")]
    pub close_probability: Probability,

    /// Latency budget checked for products added to an open reception (supports ms/s/m/h)
    #[arg(long = "latency-budget", default_value = "100ms", value_parser = parse_duration_arg)]
    pub latency_budget: Duration,

    /// City used for the fixture pickup point
    #[arg(long, default_value = "Москва")]
    pub city: City,

    /// Per-request timeout (supports ms/s/m/h)
    #[arg(long = "timeout", default_value = "60s", value_parser = parse_duration_arg)]
    pub request_timeout: Duration,

    /// Status or status range counted as an expected response (repeatable, default 200-399)
    #[arg(long = "expected-status", value_parser = parse_status_range)]
    pub expected_statuses: Vec<StatusRange>,

    /// How often the load controller recomputes the VU target (supports ms/s/m/h)
    #[arg(long = "tick-interval", default_value = "100ms", value_parser = parse_duration_arg)]
    pub tick_interval: Duration,

    /// How long in-flight iterations may run after the last stage ends (supports ms/s/m/h)
    #[arg(long = "graceful-stop", default_value = "30s", value_parser = parse_non_negative_duration_arg)]
    pub graceful_stop: Duration,

    /// How often thresholds are re-evaluated while the test runs (supports ms/s/m/h)
    #[arg(long = "threshold-interval", default_value = "2s", value_parser = parse_duration_arg)]
    pub threshold_interval: Duration,

    /// Write the end-of-run summary as JSON to this path
    #[arg(long = "summary-export")]
    pub summary_export: Option<String>,

    /// Format of the summary printed to stdout
    #[arg(long = "output-format", value_enum, default_value = "text")]
    pub output_format: OutputFormat,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long = "no-color", env = "NO_COLOR", value_parser = clap::builder::BoolishValueParser::new())]
    pub no_color: bool,
}
