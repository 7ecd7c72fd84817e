mod api;
mod cli;

use anyhow::Result;
use clap::Parser;
use tokio::runtime::Runtime;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::commands::run_cli;
use cli::opts::Cli;

fn main() -> Result<()> {
    let args = Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let rt = Runtime::new()?;
    rt.block_on(run_cli(args))
}
