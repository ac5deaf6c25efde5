use thiserror::Error;

/// Failures of the one-time setup phase. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Setup step '{step}' failed to reach the service: {message}")]
    SetupTransport { step: &'static str, message: String },
    #[error("Setup step '{step}' returned status {status} (expected {expected}).")]
    SetupUnexpectedStatus {
        step: &'static str,
        status: u16,
        expected: u16,
    },
    #[error("Setup step '{step}' returned no token.")]
    SetupMissingToken { step: &'static str },
}
