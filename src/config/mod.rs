//! Configuration loading and application.
mod apply;
mod loader;
mod parse;
pub mod types;


pub use apply::apply_config;
pub use loader::load_config;

#[cfg(test)]
pub(crate) use loader::load_config_file;
pub(crate) use parse::{
    DECIMAL_SCALE, format_decimal_micros, parse_decimal_micros, parse_duration_value,
    parse_positive_duration,
};
