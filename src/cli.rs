use std::{net::SocketAddr, path::PathBuf, time::Duration};

use clap::Parser;
use tracing::metadata::LevelFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub(crate) struct CliArgs {
    /// Path to the TOML file listing the service and its dependencies
    #[clap(short = 'c', long)]
    pub(crate) config: PathBuf,

    /// Address to serve the health endpoint on, overrides `listen` in the
    /// config file
    #[clap(short = 'l', long)]
    pub(crate) listen: Option<SocketAddr>,

    /// Wait up to this long for all hard dependencies to become healthy
    /// before serving. Exit with failure if they don't.
    #[clap(long)]
    #[clap(parse(try_from_str = parse_duration::parse))]
    pub(crate) wait_timeout: Option<Duration>,

    /// Level of logging verbosity [possible values: off, error, warn, info,
    /// debug, trace]
    #[clap(long)]
    #[clap(default_value = "info")]
    pub(crate) log_level: LevelFilter,
}
