mod build_status;
mod check;
mod config;
mod error;
mod hydra;
mod jobset;
mod rendering;
mod utils;

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::{
    check::{OutputMode, Query},
    config::{Config, read_config},
    error::HydraError,
    rendering::RenderOptions,
    utils::HttpFetcher,
};

#[derive(Parser, Debug)]
#[command(version, verbatim_doc_comment)]
/// Check hydra.nixos.org for the build status of packages
///
/// Channels can be:
///   - unstable  - alias for nixos/trunk-combined (default)
///   - master    - alias for nixpkgs/trunk
///   - staging   - alias for nixos/staging
///   - 20.03     - alias for nixos/release-20.03
///   - nixos-unstable-small, staging-next, nixos-23.11, nixpkgs-24.05-darwin
///
/// Any other value is used as a verbatim jobset name, e.g. nixpkgs/nixpkgs-20.03-darwin,
/// which can also be given directly with --jobset.
struct Cli {
    #[arg(id = "PACKAGES", required = true)]
    packages: Vec<String>,

    /// System architecture to check, empty for none [default: x86_64-linux]
    #[arg(short, long)]
    arch: Option<String>,

    /// Channel to check packages for [default: unstable]
    #[arg(short, long)]
    channel: Option<String>,

    /// Jobset to check packages for, e.g. nixpkgs/nixpkgs-20.03-darwin
    #[arg(long, conflicts_with = "channel")]
    jobset: Option<String>,

    /// Write builds in machine-readable format
    #[arg(long)]
    json: bool,

    /// Only print the hydra build url, then exit
    #[arg(long, conflicts_with = "json")]
    url: bool,

    /// Write only the latest build even if last build failed
    #[arg(short, long)]
    short: bool,

    /// Base url of the Hydra instance
    #[arg(long)]
    host: Option<String>,

    /// Config file [default: ~/.hydra-status.json]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print debugging information
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_query(self, config: Config) -> Query {
        let mode = if self.url {
            OutputMode::Url
        } else if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text(RenderOptions { short: self.short })
        };
        Query {
            packages: self.packages,
            arch: self.arch.unwrap_or(config.arch),
            channel: self.channel.unwrap_or(config.channel),
            jobset: self.jobset,
            host_url: self.host.unwrap_or(config.host_url),
            mode,
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "warn,hydra_status=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = read_config(cli.config.as_deref())?;
    let fetcher = HttpFetcher::new(config.timeout())?;
    let query = cli.into_query(config);

    let mut stdout = std::io::stdout().lock();
    match check::run(&query, &fetcher, &mut stdout).await {
        Ok(true) => Ok(ExitCode::SUCCESS),
        Ok(false) => Ok(ExitCode::FAILURE),
        Err(e @ HydraError::NotFound { .. }) => {
            eprintln!("{e}");
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}
