//! metabase - command-line client for the Metabase REST API.
//!
//! A thin layer over `metabase-client`: argument parsing, profile
//! configuration and output rendering.

mod cli;
mod commands;
mod config;
mod context;
mod output;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::Cli;
use config::ConfigStore;
use context::AppContext;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs);

    let json = cli.json;
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::report_error(&err, json);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let store = ConfigStore::new()?;
    let ctx = AppContext::new(cli.profile, cli.json, store);
    commands::handle(cli.command, &ctx).await
}

/// Our crates log at the level picked by `-v`; HTTP internals stay at
/// `warn` until `-vvv`. `RUST_LOG` replaces all of it.
fn log_filter(verbosity: u8) -> String {
    let (ours, deps) = match verbosity {
        0 => ("warn", "warn"),
        1 => ("info", "warn"),
        2 => ("debug", "warn"),
        _ => ("trace", "debug"),
    };
    format!("{deps},metabase={ours},metabase_client={ours},metabase_core={ours}")
}

fn init_logging(verbosity: u8, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter(verbosity)));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
