use std::collections::BTreeMap;
use std::time::Duration;

use hdrhistogram::Histogram;

use crate::error::MetricsError;

/// Percentiles are given in millionths of a percent (`95_000_000` is p95).
const PERCENT_SCALE: u128 = 100_000_000;

/// Latency histogram in microseconds with three significant digits.
#[derive(Debug, Clone)]
pub struct LatencyHistogram {
    hist: Histogram<u64>,
    /// Largest exact sample seen in each bucket, keyed by the bucket's lowest value.
    bucket_max: BTreeMap<u64, u64>,
    min_micros: u64,
    max_micros: u64,
}

impl LatencyHistogram {
    /// Create a new latency histogram.
    ///
    /// # Errors
    ///
    /// Returns an error if the histogram cannot be created.
    pub fn new() -> Result<Self, MetricsError> {
        let hist = Histogram::<u64>::new(3).map_err(|err| MetricsError::Histogram {
            context: "create",
            source: Box::new(err),
        })?;
        Ok(Self {
            hist,
            bucket_max: BTreeMap::new(),
            min_micros: u64::MAX,
            max_micros: 0,
        })
    }

    /// Record one latency sample.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be recorded.
    pub fn record(&mut self, latency: Duration) -> Result<u64, MetricsError> {
        let micros = u64::try_from(latency.as_micros())
            .unwrap_or(u64::MAX)
            .max(1);
        self.hist
            .record(micros)
            .map_err(|err| MetricsError::Histogram {
                context: "record",
                source: Box::new(err),
            })?;
        let top = self
            .bucket_max
            .entry(self.hist.lowest_equivalent(micros))
            .or_insert(micros);
        *top = (*top).max(micros);
        self.min_micros = self.min_micros.min(micros);
        self.max_micros = self.max_micros.max(micros);
        Ok(micros)
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.hist.len()
    }

    #[must_use]
    pub fn min_micros(&self) -> Option<u64> {
        (self.count() > 0).then_some(self.min_micros)
    }

    #[must_use]
    pub fn max_micros(&self) -> Option<u64> {
        (self.count() > 0).then_some(self.max_micros)
    }

    /// Nearest-rank percentile: the smallest recorded value such that at
    /// least `p` percent of the samples are less than or equal to it.
    /// Reports the largest sample recorded in the rank's bucket: exact when
    /// the bucket holds one distinct value, and never below the true rank
    /// value otherwise.
    #[must_use]
    pub fn percentile_micros(&self, percent_micros: u64) -> Option<u64> {
        let count = self.count();
        if count == 0 {
            return None;
        }
        let wanted = u128::from(percent_micros).saturating_mul(u128::from(count));
        let rank = wanted
            .div_ceil(PERCENT_SCALE)
            .clamp(1, u128::from(count));

        let mut seen: u128 = 0;
        for bucket in self.hist.iter_recorded() {
            seen = seen.saturating_add(u128::from(bucket.count_at_value()));
            if seen >= rank {
                return Some(self.rank_value(bucket.value_iterated_to()));
            }
        }
        Some(self.max_micros)
    }

    fn rank_value(&self, bucket_value: u64) -> u64 {
        self.bucket_max
            .get(&self.hist.lowest_equivalent(bucket_value))
            .copied()
            .unwrap_or_else(|| self.hist.highest_equivalent(bucket_value))
            .clamp(self.min_micros, self.max_micros)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppResult;

    fn filled(samples: &[(u64, usize)]) -> AppResult<LatencyHistogram> {
        let mut hist = LatencyHistogram::new()?;
        for &(millis, times) in samples {
            for _ in 0..times {
                hist.record(Duration::from_millis(millis))?;
            }
        }
        Ok(hist)
    }

    #[test]
    fn empty_histogram_has_no_percentile() -> AppResult<()> {
        let hist = LatencyHistogram::new()?;
        if hist.percentile_micros(95_000_000).is_some() || hist.min_micros().is_some() {
            return Err(MetricsError::from("Expected no data").into());
        }
        Ok(())
    }

    #[test]
    fn nearest_rank_percentile_splits_groups() -> AppResult<()> {
        let hist = filled(&[(50, 95), (200, 5)])?;
        let p95 = hist.percentile_micros(95_000_000);
        if p95 != Some(50_000) {
            return Err(MetricsError::from(format!("Unexpected p95: {:?}", p95)).into());
        }
        let p96 = hist.percentile_micros(96_000_000);
        if p96 != Some(200_000) {
            return Err(MetricsError::from(format!("Unexpected p96: {:?}", p96)).into());
        }
        Ok(())
    }

    #[test]
    fn percentile_is_clamped_to_exact_extremes() -> AppResult<()> {
        let hist = filled(&[(100, 10)])?;
        if hist.percentile_micros(100_000_000) != Some(100_000) {
            return Err(MetricsError::from("Expected exact max").into());
        }
        if hist.percentile_micros(0) != Some(100_000) {
            return Err(MetricsError::from("Expected exact min").into());
        }
        Ok(())
    }

    #[test]
    fn inner_bucket_reports_exact_sample() -> AppResult<()> {
        let hist = filled(&[(50, 90), (100, 6), (300, 4)])?;
        let p95 = hist.percentile_micros(95_000_000);
        if p95 != Some(100_000) {
            return Err(MetricsError::from(format!("Unexpected p95: {:?}", p95)).into());
        }
        Ok(())
    }

    #[test]
    fn shared_bucket_never_reports_below_rank() -> AppResult<()> {
        let mut hist = LatencyHistogram::new()?;
        for micros in [99_970, 99_990, 100_000] {
            hist.record(Duration::from_micros(micros))?;
        }
        let median = hist.percentile_micros(50_000_000);
        if median != Some(100_000) {
            return Err(MetricsError::from(format!("Unexpected median: {:?}", median)).into());
        }
        Ok(())
    }

    #[test]
    fn sub_microsecond_samples_round_up() -> AppResult<()> {
        let mut hist = LatencyHistogram::new()?;
        let recorded = hist.record(Duration::from_nanos(10))?;
        if recorded != 1 || hist.min_micros() != Some(1) {
            return Err(MetricsError::from("Expected 1us floor").into());
        }
        Ok(())
    }
}
