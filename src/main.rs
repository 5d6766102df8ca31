//! Binary entry point for the imgforge pipeline CLI.
//!
//! Wires up the tracing stack from CLI and environment settings, then
//! dispatches to the `cli` module for the actual commands.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // The log level flag lives on the CLI, so arguments are parsed before
    // tracing init.
    let cli = imgforge::cli::parse_cli();

    // RUST_LOG wins over --log-level, which wins over the built-in default.
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| cli.log_level.clone());

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)))
        .init();

    imgforge::cli::run_with_cli(cli).await
}
