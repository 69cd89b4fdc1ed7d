//! CLI entry point for pfw.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use pfw_cli::{App, Cli, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is the normal case.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(if cli.verbose { "debug" } else { "warn" });

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    let app = App::live(&config).context("failed to initialize")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    app.run(&cli.command, &mut out).await?;
    Ok(())
}

/// Logs go to stderr; stdout is reserved for command output.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
