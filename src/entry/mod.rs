mod plan;

use clap::{ArgMatches, CommandFactory, FromArgMatches};

use crate::args::LoadTestArgs;
use crate::config::{apply_config, load_config};
use crate::error::AppResult;
use plan::{build_plan, execute_plan};

pub(crate) fn run() -> AppResult<()> {
    let (mut args, matches) = parse_args()?;
    merge_config(&mut args, &matches)?;

    crate::logger::init_logging(args.verbose, args.no_color);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_async(args))
}

fn parse_args() -> AppResult<(LoadTestArgs, ArgMatches)> {
    let matches = LoadTestArgs::command().get_matches();
    let args = LoadTestArgs::from_arg_matches(&matches)?;
    Ok((args, matches))
}

fn merge_config(args: &mut LoadTestArgs, matches: &ArgMatches) -> AppResult<()> {
    if let Some(config) = load_config(args.config.as_deref())? {
        apply_config(args, matches, &config)?;
    }
    Ok(())
}

async fn run_async(args: LoadTestArgs) -> AppResult<()> {
    let plan = build_plan(args)?;
    execute_plan(plan).await
}
