use std::fmt::{self, Write as _};
use std::time::Duration;

use crossterm::style::Stylize;
use serde::Serialize;

use crate::args::OutputFormat;
use crate::error::{AppError, AppResult, MetricsError};
use crate::metrics::{
    Counter, Gauge, MetricName, MetricsReport, Observed, Rate, Trend, Verdict,
};
use crate::vu::PoolReport;

const NAME_WIDTH: usize = 44;

/// End-of-run summary. The text output and the JSON export are two views of it.
#[derive(Debug, Serialize)]
pub(crate) struct RunSummary {
    pub scenario: &'static str,
    pub duration_ms: u128,
    pub passed: bool,
    pub interrupted_iterations: u64,
    pub checks: Vec<CheckSummary>,
    pub metrics: Vec<MetricSummary>,
    pub thresholds: Vec<ThresholdSummary>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CheckSummary {
    pub name: &'static str,
    pub passes: u64,
    pub fails: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct MetricSummary {
    pub name: String,
    pub kind: &'static str,
    pub values: Vec<MetricValue>,
}

/// Decimal values are strings so exact fixed-point output survives JSON.
#[derive(Debug, Serialize)]
pub(crate) struct MetricValue {
    pub name: &'static str,
    pub value: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ThresholdSummary {
    pub metric: String,
    pub expression: String,
    pub observed: Option<String>,
    pub verdict: Verdict,
}

#[must_use]
pub(crate) fn build_summary(
    scenario: &'static str,
    report: &MetricsReport,
    pool: &PoolReport,
) -> RunSummary {
    let registry = &report.registry;
    let elapsed = report.elapsed;

    let checks = registry
        .check_tallies()
        .iter()
        .map(|tally| CheckSummary {
            name: tally.name,
            passes: tally.rate.passes,
            fails: tally.rate.fails(),
        })
        .collect();

    let mut metrics = vec![
        rate_summary(MetricName::Checks.as_str().to_owned(), registry.checks()),
        trend_summary(
            MetricName::HttpReqDuration.as_str().to_owned(),
            &registry.requests().duration,
        ),
    ];
    for (name, per_name) in registry.requests_by_name() {
        metrics.push(trend_summary(
            format!("{}{{name:{}}}", MetricName::HttpReqDuration, name),
            &per_name.duration,
        ));
    }
    metrics.push(rate_summary(
        MetricName::HttpReqFailed.as_str().to_owned(),
        registry.requests().failed,
    ));
    for (name, per_name) in registry.requests_by_name() {
        metrics.push(rate_summary(
            format!("{}{{name:{}}}", MetricName::HttpReqFailed, name),
            per_name.failed,
        ));
    }
    metrics.push(counter_summary(
        MetricName::HttpReqs.as_str().to_owned(),
        registry.requests().reqs,
        elapsed,
    ));
    metrics.push(trend_summary(
        MetricName::IterationDuration.as_str().to_owned(),
        registry.iteration_duration(),
    ));
    metrics.push(counter_summary(
        MetricName::Iterations.as_str().to_owned(),
        registry.iterations(),
        elapsed,
    ));
    metrics.push(gauge_summary(MetricName::Vus, registry.vus()));
    metrics.push(gauge_summary(MetricName::VusMax, registry.vus_max()));

    let thresholds: Vec<ThresholdSummary> = report
        .outcomes
        .iter()
        .map(|outcome| ThresholdSummary {
            metric: outcome.threshold.selector.to_string(),
            expression: outcome.threshold.expression(),
            observed: outcome.observed.map(|value| value.to_string()),
            verdict: outcome.verdict,
        })
        .collect();

    RunSummary {
        scenario,
        duration_ms: elapsed.as_millis(),
        passed: report.failed_thresholds() == 0,
        interrupted_iterations: pool.interrupted,
        checks,
        metrics,
        thresholds,
    }
}

fn value(name: &'static str, observed: Option<Observed>) -> MetricValue {
    MetricValue {
        name,
        value: observed.map(|value| value.to_string()),
    }
}

fn trend_summary(name: String, trend: &Trend) -> MetricSummary {
    MetricSummary {
        name,
        kind: "trend",
        values: trend
            .summary_values()
            .into_iter()
            .map(|(label, observed)| value(label, observed))
            .collect(),
    }
}

fn rate_summary(name: String, rate: Rate) -> MetricSummary {
    MetricSummary {
        name,
        kind: "rate",
        values: vec![
            value("rate", rate.rate()),
            value("passes", Some(Observed::whole(rate.passes))),
            value("fails", Some(Observed::whole(rate.fails()))),
        ],
    }
}

fn counter_summary(name: String, counter: Counter, elapsed: Duration) -> MetricSummary {
    MetricSummary {
        name,
        kind: "counter",
        values: counter
            .summary_values(elapsed)
            .into_iter()
            .map(|(label, observed)| value(label, observed))
            .collect(),
    }
}

fn gauge_summary(metric: MetricName, gauge: Gauge) -> MetricSummary {
    MetricSummary {
        name: metric.as_str().to_owned(),
        kind: "gauge",
        values: vec![
            value("value", Some(Observed::whole(gauge.value))),
            value("max", Some(Observed::whole(gauge.max))),
        ],
    }
}

/// Prints the summary to stdout in the requested format.
///
/// # Errors
///
/// Returns an error if the summary cannot be rendered or serialized.
pub(crate) fn print_summary(
    summary: &RunSummary,
    format: OutputFormat,
    no_color: bool,
) -> AppResult<()> {
    match format {
        OutputFormat::Text => {
            let text = render_text(summary, no_color)
                .map_err(|err| AppError::metrics(MetricsError::RenderSummary { source: err }))?;
            print!("{}", text);
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(summary).map_err(|err| {
                AppError::metrics(MetricsError::SerializeSummary { source: err })
            })?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn mark(passed: bool, no_color: bool) -> String {
    match (passed, no_color) {
        (true, true) => "✓".to_owned(),
        (false, true) => "✗".to_owned(),
        (true, false) => "✓".green().to_string(),
        (false, false) => "✗".red().to_string(),
    }
}

fn unit(kind: &str, value: &str) -> &'static str {
    match (kind, value) {
        ("trend", _) => "ms",
        ("counter", "rate") => "/s",
        _ => "",
    }
}

fn percent_x100(passes: u64, total: u64) -> u64 {
    let scaled = u128::from(passes)
        .saturating_mul(10_000)
        .checked_div(u128::from(total))
        .unwrap_or(0);
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

/// Renders the text view.
///
/// # Errors
///
/// Returns an error only if formatting into the buffer fails.
pub(crate) fn render_text(summary: &RunSummary, no_color: bool) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out)?;
    writeln!(
        out,
        "  scenario: {}  duration: {}.{:03}s",
        summary.scenario,
        summary.duration_ms / 1000,
        summary.duration_ms % 1000
    )?;
    if summary.interrupted_iterations > 0 {
        writeln!(
            out,
            "  interrupted iterations: {}",
            summary.interrupted_iterations
        )?;
    }

    if !summary.checks.is_empty() {
        writeln!(out)?;
        for check in &summary.checks {
            let total = check.passes.saturating_add(check.fails);
            let pct = percent_x100(check.passes, total);
            writeln!(
                out,
                "    {} {}",
                mark(check.fails == 0, no_color),
                check.name
            )?;
            if check.fails > 0 {
                writeln!(
                    out,
                    "      ↳ {}.{:02}% ({} passed / {} failed)",
                    pct / 100,
                    pct % 100,
                    check.passes,
                    check.fails
                )?;
            }
        }
    }

    writeln!(out)?;
    for metric in &summary.metrics {
        let values: Vec<String> = metric
            .values
            .iter()
            .map(|entry| match entry.value.as_deref() {
                Some(text) => format!("{}={}{}", entry.name, text, unit(metric.kind, entry.name)),
                None => format!("{}=-", entry.name),
            })
            .collect();
        let dots = NAME_WIDTH.saturating_sub(metric.name.chars().count());
        writeln!(
            out,
            "    {}{}: {}",
            metric.name,
            ".".repeat(dots),
            values.join(" ")
        )?;
    }

    if !summary.thresholds.is_empty() {
        writeln!(out)?;
        writeln!(out, "  thresholds:")?;
        for threshold in &summary.thresholds {
            let observed = threshold.observed.as_deref().unwrap_or("no data");
            let status = match threshold.verdict {
                Verdict::Passed => mark(true, no_color),
                Verdict::Failed => mark(false, no_color),
                Verdict::NoData => "-".to_owned(),
            };
            writeln!(
                out,
                "    {} {}: {} (observed {})",
                status, threshold.metric, threshold.expression, observed
            )?;
        }
    }

    writeln!(out)?;
    let verdict = if summary.passed {
        "  result: passed"
    } else {
        "  result: thresholds failed"
    };
    writeln!(out, "{}", verdict)?;
    Ok(out)
}
