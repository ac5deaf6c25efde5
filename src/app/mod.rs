mod export;
mod progress;
mod runner;
mod summary;


pub(crate) use export::export_summary;
pub(crate) use runner::{RunOutcome, RunSettings, run_scenario};
pub(crate) use summary::print_summary;
