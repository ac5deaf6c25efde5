//! Load-test harness for the PVZ pickup-point API.
//!
//! The binary ramps virtual users along configured stages, runs the PVZ
//! reception scenario in each of them, records k6-style metrics and checks,
//! and fails the run when a threshold is violated. The modules are public so
//! other scenarios can reuse the pool, client, and threshold evaluator; the
//! `pvzload` command-line application is the primary interface.
mod app;
pub mod args;
pub mod config;
mod entry;
pub mod error;
pub mod http;
pub mod load;
pub mod logger;
pub mod metrics;
pub mod scenario;
pub mod shutdown;
pub mod vu;

#[cfg(test)]
pub(crate) mod test_support;

/// Parses the command line, loads config, and runs the load test.
///
/// # Errors
///
/// Returns an error when configuration or setup fails, or when any threshold
/// fails at the end of the run.
pub fn run() -> error::AppResult<()> {
    entry::run()
}
