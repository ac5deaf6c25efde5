use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::time::Duration;

use crate::error::MetricsError;

use super::histogram::LatencyHistogram;
use super::thresholds::{Aggregation, MetricName, MetricSelector, Observed};
use super::types::{MetricEvent, RequestSample};

const MICROS_PER_MILLI: u128 = 1_000;
const MEDIAN_PERCENT_MICROS: u64 = 50_000_000;

#[derive(Debug, Clone, Copy, Default)]
pub struct Counter {
    pub count: u64,
}

impl Counter {
    fn add(&mut self) {
        self.count = self.count.saturating_add(1);
    }

    fn observe(self, aggregation: Aggregation, elapsed: Duration) -> Option<Observed> {
        match aggregation {
            Aggregation::Count => Some(Observed::whole(self.count)),
            Aggregation::Rate => Some(Observed::ratio(
                u128::from(self.count).saturating_mul(MICROS_PER_MILLI),
                elapsed.as_millis(),
            )),
            Aggregation::Avg
            | Aggregation::Min
            | Aggregation::Max
            | Aggregation::Med
            | Aggregation::Percentile(_)
            | Aggregation::Value => None,
        }
    }
}

/// Duration samples, reported in milliseconds.
#[derive(Debug, Clone)]
pub struct Trend {
    histogram: LatencyHistogram,
    sum_micros: u128,
}

impl Trend {
    fn new() -> Result<Self, MetricsError> {
        Ok(Self {
            histogram: LatencyHistogram::new()?,
            sum_micros: 0,
        })
    }

    fn add(&mut self, duration: Duration) -> Result<(), MetricsError> {
        let micros = self.histogram.record(duration)?;
        self.sum_micros = self.sum_micros.saturating_add(u128::from(micros));
        Ok(())
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.histogram.count()
    }

    fn observe(&self, aggregation: Aggregation) -> Option<Observed> {
        let millis = |micros: u64| Observed::ratio(u128::from(micros), MICROS_PER_MILLI);
        match aggregation {
            Aggregation::Avg => {
                let count = u128::from(self.count());
                (count > 0).then(|| {
                    Observed::ratio(self.sum_micros, count.saturating_mul(MICROS_PER_MILLI))
                })
            }
            Aggregation::Min => self.histogram.min_micros().map(millis),
            Aggregation::Max => self.histogram.max_micros().map(millis),
            Aggregation::Med => self
                .histogram
                .percentile_micros(MEDIAN_PERCENT_MICROS)
                .map(millis),
            Aggregation::Percentile(percent) => {
                self.histogram.percentile_micros(percent).map(millis)
            }
            Aggregation::Rate | Aggregation::Count | Aggregation::Value => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Rate {
    pub passes: u64,
    pub total: u64,
}

impl Rate {
    fn add(&mut self, hit: bool) {
        self.total = self.total.saturating_add(1);
        if hit {
            self.passes = self.passes.saturating_add(1);
        }
    }

    #[must_use]
    pub const fn fails(self) -> u64 {
        self.total.saturating_sub(self.passes)
    }

    fn observe(self, aggregation: Aggregation) -> Option<Observed> {
        match aggregation {
            Aggregation::Rate if self.total > 0 => Some(Observed::ratio(
                u128::from(self.passes),
                u128::from(self.total),
            )),
            Aggregation::Rate
            | Aggregation::Avg
            | Aggregation::Min
            | Aggregation::Max
            | Aggregation::Med
            | Aggregation::Percentile(_)
            | Aggregation::Count
            | Aggregation::Value => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Gauge {
    pub value: u64,
    pub max: u64,
    seen: bool,
}

impl Gauge {
    fn set(&mut self, value: u64) {
        self.value = value;
        self.max = self.max.max(value);
        self.seen = true;
    }

    fn observe(self, aggregation: Aggregation) -> Option<Observed> {
        match aggregation {
            Aggregation::Value if self.seen => Some(Observed::whole(self.value)),
            Aggregation::Value
            | Aggregation::Avg
            | Aggregation::Min
            | Aggregation::Max
            | Aggregation::Med
            | Aggregation::Percentile(_)
            | Aggregation::Rate
            | Aggregation::Count => None,
        }
    }
}

/// The three request metrics, kept once overall and once per request name.
#[derive(Debug, Clone)]
pub struct RequestMetrics {
    pub reqs: Counter,
    pub duration: Trend,
    pub failed: Rate,
}

impl RequestMetrics {
    fn new() -> Result<Self, MetricsError> {
        Ok(Self {
            reqs: Counter::default(),
            duration: Trend::new()?,
            failed: Rate::default(),
        })
    }

    fn add(&mut self, sample: &RequestSample) -> Result<(), MetricsError> {
        self.reqs.add();
        self.failed.add(sample.failed);
        if sample.status.is_some() {
            self.duration.add(sample.duration)?;
        }
        Ok(())
    }

    fn observe(
        &self,
        metric: MetricName,
        aggregation: Aggregation,
        elapsed: Duration,
    ) -> Option<Observed> {
        match metric {
            MetricName::HttpReqs => self.reqs.observe(aggregation, elapsed),
            MetricName::HttpReqDuration => self.duration.observe(aggregation),
            MetricName::HttpReqFailed => self.failed.observe(aggregation),
            MetricName::Checks
            | MetricName::Iterations
            | MetricName::IterationDuration
            | MetricName::Vus
            | MetricName::VusMax => None,
        }
    }
}

/// Pass/fail tally of one named check.
#[derive(Debug, Clone)]
pub struct CheckTally {
    pub name: &'static str,
    pub rate: Rate,
}

/// Every metric of a run. Owned by the collector task.
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    requests: RequestMetrics,
    by_name: BTreeMap<&'static str, RequestMetrics>,
    checks: Rate,
    check_tallies: Vec<CheckTally>,
    iterations: Counter,
    iteration_duration: Trend,
    vus: Gauge,
    vus_max: Gauge,
}

impl MetricsRegistry {
    /// Creates an empty registry.
    ///
    /// # Errors
    ///
    /// Returns an error if a histogram cannot be allocated.
    pub fn new() -> Result<Self, MetricsError> {
        Ok(Self {
            requests: RequestMetrics::new()?,
            by_name: BTreeMap::new(),
            checks: Rate::default(),
            check_tallies: Vec::new(),
            iterations: Counter::default(),
            iteration_duration: Trend::new()?,
            vus: Gauge::default(),
            vus_max: Gauge::default(),
        })
    }

    /// Folds one event into the aggregates.
    ///
    /// # Errors
    ///
    /// Returns an error if a duration cannot be recorded.
    pub fn record(&mut self, event: MetricEvent) -> Result<(), MetricsError> {
        match event {
            MetricEvent::Request(sample) => {
                self.requests.add(&sample)?;
                let per_name = match self.by_name.entry(sample.name) {
                    Entry::Occupied(entry) => entry.into_mut(),
                    Entry::Vacant(entry) => {
                        entry.insert(RequestMetrics::new()?)
                    }
                };
                per_name.add(&sample)?;
            }
            MetricEvent::Check(sample) => {
                self.checks.add(sample.passed);
                if let Some(tally) = self
                    .check_tallies
                    .iter_mut()
                    .find(|tally| tally.name == sample.name)
                {
                    tally.rate.add(sample.passed);
                } else {
                    let mut rate = Rate::default();
                    rate.add(sample.passed);
                    self.check_tallies.push(CheckTally {
                        name: sample.name,
                        rate,
                    });
                }
            }
            MetricEvent::Iteration { duration } => {
                self.iterations.add();
                self.iteration_duration.add(duration)?;
            }
            MetricEvent::Vus { active, max } => {
                self.vus.set(active);
                self.vus_max.set(max);
            }
        }
        Ok(())
    }

    /// Aggregated value for a selector, or `None` when there is no data.
    #[must_use]
    pub fn observe(
        &self,
        selector: &MetricSelector,
        aggregation: Aggregation,
        elapsed: Duration,
    ) -> Option<Observed> {
        if let Some(name) = selector.name_tag.as_deref() {
            return self
                .by_name
                .get(name)
                .and_then(|metrics| metrics.observe(selector.metric, aggregation, elapsed));
        }
        match selector.metric {
            MetricName::HttpReqs | MetricName::HttpReqDuration | MetricName::HttpReqFailed => {
                self.requests
                    .observe(selector.metric, aggregation, elapsed)
            }
            MetricName::Checks => self.checks.observe(aggregation),
            MetricName::Iterations => self.iterations.observe(aggregation, elapsed),
            MetricName::IterationDuration => self.iteration_duration.observe(aggregation),
            MetricName::Vus => self.vus.observe(aggregation),
            MetricName::VusMax => self.vus_max.observe(aggregation),
        }
    }

    #[must_use]
    pub fn requests(&self) -> &RequestMetrics {
        &self.requests
    }

    pub fn requests_by_name(&self) -> impl Iterator<Item = (&'static str, &RequestMetrics)> {
        self.by_name.iter().map(|(name, metrics)| (*name, metrics))
    }

    #[must_use]
    pub fn checks(&self) -> Rate {
        self.checks
    }

    /// Checks in the order they were first seen.
    #[must_use]
    pub fn check_tallies(&self) -> &[CheckTally] {
        &self.check_tallies
    }

    #[must_use]
    pub fn iterations(&self) -> Counter {
        self.iterations
    }

    #[must_use]
    pub fn iteration_duration(&self) -> &Trend {
        &self.iteration_duration
    }

    #[must_use]
    pub fn vus(&self) -> Gauge {
        self.vus
    }

    #[must_use]
    pub fn vus_max(&self) -> Gauge {
        self.vus_max
    }
}

impl Trend {
    /// Aggregates shown in the summary: avg, min, med, max, p(90), p(95).
    #[must_use]
    pub fn summary_values(&self) -> Vec<(&'static str, Option<Observed>)> {
        vec![
            ("avg", self.observe(Aggregation::Avg)),
            ("min", self.observe(Aggregation::Min)),
            ("med", self.observe(Aggregation::Med)),
            ("max", self.observe(Aggregation::Max)),
            ("p(90)", self.observe(Aggregation::Percentile(90_000_000))),
            ("p(95)", self.observe(Aggregation::Percentile(95_000_000))),
        ]
    }
}

impl Counter {
    /// Count and per-second rate over `elapsed`.
    #[must_use]
    pub fn summary_values(self, elapsed: Duration) -> Vec<(&'static str, Option<Observed>)> {
        vec![
            ("count", self.observe(Aggregation::Count, elapsed)),
            ("rate", self.observe(Aggregation::Rate, elapsed)),
        ]
    }
}

impl Rate {
    #[must_use]
    pub fn rate(self) -> Option<Observed> {
        self.observe(Aggregation::Rate)
    }
}
