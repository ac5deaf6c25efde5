use clap::Parser;

use crate::error::{AppError, AppResult};

use super::LoadTestArgs;

pub(crate) fn parse_test_args<I, T>(args: I) -> AppResult<LoadTestArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    LoadTestArgs::try_parse_from(args).map_err(AppError::from)
}
