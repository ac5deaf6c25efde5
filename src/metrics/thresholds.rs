use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::config::{DECIMAL_SCALE, format_decimal_micros, parse_decimal_micros};
use crate::error::ValidationError;

use super::registry::MetricsRegistry;

const MAX_PERCENT_MICROS: u64 = 100_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MetricKind {
    Counter,
    Trend,
    Rate,
    Gauge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MetricName {
    HttpReqs,
    HttpReqDuration,
    HttpReqFailed,
    Checks,
    Iterations,
    IterationDuration,
    Vus,
    VusMax,
}

impl MetricName {
    pub const ALL: [MetricName; 8] = [
        MetricName::Checks,
        MetricName::HttpReqDuration,
        MetricName::HttpReqFailed,
        MetricName::HttpReqs,
        MetricName::IterationDuration,
        MetricName::Iterations,
        MetricName::Vus,
        MetricName::VusMax,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            MetricName::HttpReqs => "http_reqs",
            MetricName::HttpReqDuration => "http_req_duration",
            MetricName::HttpReqFailed => "http_req_failed",
            MetricName::Checks => "checks",
            MetricName::Iterations => "iterations",
            MetricName::IterationDuration => "iteration_duration",
            MetricName::Vus => "vus",
            MetricName::VusMax => "vus_max",
        }
    }

    #[must_use]
    pub const fn kind(self) -> MetricKind {
        match self {
            MetricName::HttpReqs | MetricName::Iterations => MetricKind::Counter,
            MetricName::HttpReqDuration | MetricName::IterationDuration => MetricKind::Trend,
            MetricName::HttpReqFailed | MetricName::Checks => MetricKind::Rate,
            MetricName::Vus | MetricName::VusMax => MetricKind::Gauge,
        }
    }

    /// Request metrics can be narrowed to one request name.
    #[must_use]
    pub const fn is_request_metric(self) -> bool {
        matches!(
            self,
            MetricName::HttpReqs | MetricName::HttpReqDuration | MetricName::HttpReqFailed
        )
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricName::ALL
            .into_iter()
            .find(|metric| metric.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownMetric {
                metric: s.to_owned(),
            })
    }
}

/// A metric, optionally narrowed to the requests with one `name` tag,
/// e.g. `http_req_duration{name:add_product}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSelector {
    pub metric: MetricName,
    pub name_tag: Option<String>,
}

impl fmt::Display for MetricSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name_tag.as_deref() {
            Some(tag) => write!(f, "{}{{name:{}}}", self.metric, tag),
            None => write!(f, "{}", self.metric),
        }
    }
}

impl FromStr for MetricSelector {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let Some((metric_text, rest)) = trimmed.split_once('{') else {
            return Ok(Self {
                metric: trimmed.parse()?,
                name_tag: None,
            });
        };

        let invalid = || ValidationError::InvalidSubmetric {
            value: trimmed.to_owned(),
        };
        let inner = rest.strip_suffix('}').ok_or_else(invalid)?;
        let (tag, value) = inner.split_once(':').ok_or_else(invalid)?;
        let metric: MetricName = metric_text.trim().parse()?;
        let tag = tag.trim();
        let value = value.trim();
        if value.is_empty() {
            return Err(invalid());
        }
        if tag != "name" || !metric.is_request_metric() {
            return Err(ValidationError::UnsupportedSubmetricTag {
                metric: metric.as_str().to_owned(),
                tag: tag.to_owned(),
            });
        }
        Ok(Self {
            metric,
            name_tag: Some(value.to_owned()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Avg,
    Min,
    Max,
    Med,
    /// Percentile in millionths of a percent.
    Percentile(u64),
    Rate,
    Count,
    Value,
}

impl Aggregation {
    const fn supported_by(self, kind: MetricKind) -> bool {
        match kind {
            MetricKind::Trend => matches!(
                self,
                Aggregation::Avg
                    | Aggregation::Min
                    | Aggregation::Max
                    | Aggregation::Med
                    | Aggregation::Percentile(_)
            ),
            MetricKind::Rate => matches!(self, Aggregation::Rate),
            MetricKind::Counter => matches!(self, Aggregation::Count | Aggregation::Rate),
            MetricKind::Gauge => matches!(self, Aggregation::Value),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Avg => f.write_str("avg"),
            Aggregation::Min => f.write_str("min"),
            Aggregation::Max => f.write_str("max"),
            Aggregation::Med => f.write_str("med"),
            Aggregation::Percentile(percent) => write!(f, "p({})", format_decimal_micros(*percent)),
            Aggregation::Rate => f.write_str("rate"),
            Aggregation::Count => f.write_str("count"),
            Aggregation::Value => f.write_str("value"),
        }
    }
}

impl FromStr for Aggregation {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed {
            "avg" => return Ok(Aggregation::Avg),
            "min" => return Ok(Aggregation::Min),
            "max" => return Ok(Aggregation::Max),
            "med" => return Ok(Aggregation::Med),
            "rate" => return Ok(Aggregation::Rate),
            "count" => return Ok(Aggregation::Count),
            "value" => return Ok(Aggregation::Value),
            _ => {}
        }

        let Some(inner) = trimmed
            .strip_prefix("p(")
            .and_then(|rest| rest.strip_suffix(')'))
        else {
            return Err(ValidationError::UnknownAggregation {
                aggregation: trimmed.to_owned(),
            });
        };
        let invalid = || ValidationError::InvalidPercentile {
            value: inner.to_owned(),
        };
        let percent = parse_decimal_micros(inner).map_err(|_err| invalid())?;
        if percent > MAX_PERCENT_MICROS {
            return Err(invalid());
        }
        Ok(Aggregation::Percentile(percent))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
}

impl Comparison {
    const fn as_str(self) -> &'static str {
        match self {
            Comparison::Less => "<",
            Comparison::LessOrEqual => "<=",
            Comparison::Greater => ">",
            Comparison::GreaterOrEqual => ">=",
            Comparison::Equal => "==",
            Comparison::NotEqual => "!=",
        }
    }

    fn holds(self, ordering: Ordering) -> bool {
        match self {
            Comparison::Less => ordering == Ordering::Less,
            Comparison::LessOrEqual => ordering != Ordering::Greater,
            Comparison::Greater => ordering == Ordering::Greater,
            Comparison::GreaterOrEqual => ordering != Ordering::Less,
            Comparison::Equal => ordering == Ordering::Equal,
            Comparison::NotEqual => ordering != Ordering::Equal,
        }
    }
}

/// An exact observed value, `numerator / denominator`, in the metric's unit
/// (milliseconds for trends, a fraction for rates, per second for counter rates).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observed {
    pub numerator: u128,
    pub denominator: u128,
}

impl Observed {
    #[must_use]
    pub const fn whole(value: u64) -> Self {
        Self {
            numerator: value as u128,
            denominator: 1,
        }
    }

    #[must_use]
    pub fn ratio(numerator: u128, denominator: u128) -> Self {
        Self {
            numerator,
            denominator: denominator.max(1),
        }
    }

    /// Compares against a decimal given in millionths.
    #[must_use]
    pub fn cmp_micros(self, micros: u64) -> Ordering {
        let scale = u128::from(DECIMAL_SCALE);
        let lhs = self.numerator.saturating_mul(scale);
        let rhs = u128::from(micros).saturating_mul(self.denominator);
        lhs.cmp(&rhs)
    }

    /// Value rounded down to millionths.
    #[must_use]
    pub fn to_micros(self) -> u64 {
        let scaled = self
            .numerator
            .saturating_mul(u128::from(DECIMAL_SCALE))
            .checked_div(self.denominator)
            .unwrap_or(0);
        u64::try_from(scaled).unwrap_or(u64::MAX)
    }
}

impl fmt::Display for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_decimal_micros(self.to_micros()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    Failed,
    NoData,
}

impl Verdict {
    #[must_use]
    pub const fn is_failed(self) -> bool {
        matches!(self, Verdict::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Threshold {
    pub selector: MetricSelector,
    pub aggregation: Aggregation,
    pub comparison: Comparison,
    /// Bound in millionths of the metric's unit.
    pub bound_micros: u64,
}

#[derive(Debug, Clone)]
pub struct ThresholdOutcome {
    pub threshold: Threshold,
    pub observed: Option<Observed>,
    pub verdict: Verdict,
}

impl Threshold {
    /// Parses a metric selector and an expression such as `p(95)<100`.
    ///
    /// # Errors
    ///
    /// Returns an error when the metric is unknown, the expression is
    /// malformed, or the aggregation does not apply to the metric.
    pub fn parse(metric: &str, expression: &str) -> Result<Self, ValidationError> {
        let selector: MetricSelector = metric.parse()?;
        let expression = expression.trim();
        let op_start = expression
            .find(['<', '>', '=', '!'])
            .ok_or_else(|| ValidationError::MissingOperator {
                expression: expression.to_owned(),
            })?;
        let (aggregation_text, rest) = expression.split_at(op_start);
        let (comparison, value_text) = split_operator(rest).ok_or_else(|| {
            ValidationError::MissingOperator {
                expression: expression.to_owned(),
            }
        })?;

        let aggregation: Aggregation = aggregation_text.parse()?;
        if !aggregation.supported_by(selector.metric.kind()) {
            return Err(ValidationError::AggregationNotSupported {
                metric: selector.metric.as_str().to_owned(),
                aggregation: aggregation.to_string(),
            });
        }
        let bound_micros = parse_decimal_micros(value_text)?;

        Ok(Self {
            selector,
            aggregation,
            comparison,
            bound_micros,
        })
    }

    /// Evaluates this threshold against everything recorded so far.
    #[must_use]
    pub fn evaluate(&self, registry: &MetricsRegistry, elapsed: Duration) -> ThresholdOutcome {
        let observed = registry.observe(&self.selector, self.aggregation, elapsed);
        let verdict = match observed {
            None => Verdict::NoData,
            Some(value) => {
                if self.comparison.holds(value.cmp_micros(self.bound_micros)) {
                    Verdict::Passed
                } else {
                    Verdict::Failed
                }
            }
        };
        ThresholdOutcome {
            threshold: self.clone(),
            observed,
            verdict,
        }
    }

    /// Expression part only, e.g. `p(95)<100`.
    #[must_use]
    pub fn expression(&self) -> String {
        format!(
            "{}{}{}",
            self.aggregation,
            self.comparison.as_str(),
            format_decimal_micros(self.bound_micros)
        )
    }
}

fn split_operator(rest: &str) -> Option<(Comparison, &str)> {
    const OPERATORS: [(&str, Comparison); 6] = [
        ("<=", Comparison::LessOrEqual),
        (">=", Comparison::GreaterOrEqual),
        ("==", Comparison::Equal),
        ("!=", Comparison::NotEqual),
        ("<", Comparison::Less),
        (">", Comparison::Greater),
    ];
    OPERATORS
        .iter()
        .find_map(|(text, comparison)| rest.strip_prefix(text).map(|value| (*comparison, value)))
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.selector, self.expression())
    }
}

impl FromStr for Threshold {
    type Err = ValidationError;

    /// Parses `metric: expression`, splitting at the first `:` outside a
    /// sub-metric selector.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut depth: usize = 0;
        let mut split_at = None;
        for (idx, ch) in s.char_indices() {
            match ch {
                '{' => depth = depth.saturating_add(1),
                '}' => depth = depth.saturating_sub(1),
                ':' if depth == 0 => {
                    split_at = Some(idx);
                    break;
                }
                _ => {}
            }
        }
        let invalid = || ValidationError::InvalidThresholdFormat {
            value: s.to_owned(),
        };
        let idx = split_at.ok_or_else(invalid)?;
        let metric = s.get(..idx).ok_or_else(invalid)?;
        let expression = s.get(idx.saturating_add(1)..).ok_or_else(invalid)?;
        Threshold::parse(metric, expression)
    }
}

/// Evaluates every threshold in order.
#[must_use]
pub fn evaluate_all(
    thresholds: &[Threshold],
    registry: &MetricsRegistry,
    elapsed: Duration,
) -> Vec<ThresholdOutcome> {
    thresholds
        .iter()
        .map(|threshold| threshold.evaluate(registry, elapsed))
        .collect()
}
