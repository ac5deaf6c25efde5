use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Duration must not be empty.")]
    DurationEmpty,
    #[error("Invalid duration '{value}'.")]
    InvalidDurationFormat { value: String },
    #[error("Invalid duration '{value}': {source}")]
    InvalidDurationNumber {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Duration overflow.")]
    DurationOverflow,
    #[error("Invalid duration unit '{unit}'.")]
    InvalidDurationUnit { unit: String },
    #[error("Duration must be > 0.")]
    DurationZero,
    #[error("Invalid stage '{value}'. Expected 'duration:target' (e.g., 30s:1000).")]
    InvalidStageFormat { value: String },
    #[error("Invalid stage target '{value}': {source}")]
    InvalidStageTarget {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Stage target must not be negative (got '{value}').")]
    NegativeStageTarget { value: String },
    #[error("Load profile requires at least one stage.")]
    StagesEmpty,
    #[error("Invalid threshold '{value}'. Expected 'metric: expression' (e.g., http_req_duration: p(95)<100).")]
    InvalidThresholdFormat { value: String },
    #[error("Unknown metric '{metric}'.")]
    UnknownMetric { metric: String },
    #[error("Invalid sub-metric selector '{value}'. Expected metric{{name:value}}.")]
    InvalidSubmetric { value: String },
    #[error("Metric '{metric}' does not support tag '{tag}'.")]
    UnsupportedSubmetricTag { metric: String, tag: String },
    #[error("Threshold expression '{expression}' is missing a comparison operator.")]
    MissingOperator { expression: String },
    #[error("Unknown aggregation '{aggregation}'.")]
    UnknownAggregation { aggregation: String },
    #[error("Aggregation '{aggregation}' is not available for metric '{metric}'.")]
    AggregationNotSupported { metric: String, aggregation: String },
    #[error("Percentile '{value}' must be between 0 and 100.")]
    InvalidPercentile { value: String },
    #[error("Invalid decimal '{value}'.")]
    InvalidDecimal { value: String },
    #[error("Decimal '{value}' has more than {max_digits} fractional digits.")]
    DecimalTooPrecise { value: String, max_digits: u32 },
    #[error("Probability '{value}' must be between 0 and 1.")]
    ProbabilityOutOfRange { value: String },
    #[error("Invalid status range '{value}'. Expected a code (201) or a range (200-399).")]
    InvalidStatusRange { value: String },
    #[error("Unknown city '{value}'. Use Москва, Санкт-Петербург, or Казань.")]
    UnknownCity { value: String },
    #[error("{count} threshold(s) failed.")]
    ThresholdsFailed { count: usize },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
