//! Slipway CLI - configure a build and emit its ninja build graph

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Cli;
use slipway::ops;
use slipway::util::shell;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Quote argv before clap consumes it; the regenerate-self rule
    // replays these arguments verbatim.
    let configure_args = shell::join(std::env::args().skip(1));

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("slipway=debug")
    } else {
        EnvFilter::new("slipway=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    ops::configure(cli.into_options(configure_args))
}
