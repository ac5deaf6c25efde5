//! HTTP client wrapper used by the scenario.
mod client;
mod result;

#[cfg(test)]
mod tests;

pub use client::{ClientSettings, HttpClient};
pub use result::RequestResult;

pub(crate) use client::parse_base_url;
