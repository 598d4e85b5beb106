//! Binary crate for the `warmtecheck` command-line tool.
//!
//! This crate focuses on:
//! - Trigger surfaces (one-shot run, timer, HTTP)
//! - Interactive configuration
//! - Logging setup

use clap::Parser;

mod cli;
mod server;
mod trigger;

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,warmtecheck_core=info,warmtecheck=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let cmd = cli::Cli::parse();
    cmd.run().await
}
