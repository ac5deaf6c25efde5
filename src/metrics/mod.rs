//! Metric samples, aggregation, and threshold evaluation.
mod collector;
mod histogram;
mod registry;
mod thresholds;
mod types;


pub use collector::{MetricsReport, setup_metrics_collector};
pub use histogram::LatencyHistogram;
pub use registry::{CheckTally, Counter, Gauge, MetricsRegistry, Rate, RequestMetrics, Trend};
pub use thresholds::{
    Aggregation, Comparison, MetricKind, MetricName, MetricSelector, Observed, Threshold,
    ThresholdOutcome, Verdict, evaluate_all,
};
pub use types::{CheckSample, MetricEvent, MetricsSink, RequestSample, metrics_channel};
