//! CLI argument types and parsing helpers.
mod cli;
mod defaults;
pub(crate) mod parsers;
mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use cli::LoadTestArgs;
pub use types::{City, LoadStage, OutputFormat, PROBABILITY_SCALE, Probability, StatusRange};

pub(crate) use defaults::{DEFAULT_USER_AGENT, default_stages, default_thresholds};
pub(crate) use types::NumberOrText;
