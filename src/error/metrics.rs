use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Histogram error during {context}: {source}")]
    Histogram {
        context: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("Failed to write summary '{path}': {source}")]
    WriteSummary {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize summary: {source}")]
    SerializeSummary {
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to render summary: {source}")]
    RenderSummary {
        #[source]
        source: std::fmt::Error,
    },
    #[error("Metrics collector stopped before the run finished.")]
    CollectorStopped,
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
