//! volans CLI
//!
//! Lists namespaces with their owning pods and shows per-namespace network
//! and process telemetry.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;
use tracing_subscriber::EnvFilter;
use volans_core::EngineConfig;
use volans_engine::Engine;

mod cli;
mod commands;

use cli::Cli;

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Setup logging based on verbosity; RUST_LOG wins when set
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("❌ Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli)?;

    let engine = Engine::global(config)
        .await
        .context("Failed to initialize engine")?;

    let result = commands::dispatch(engine, cli.command, cli.json).await;
    engine.shutdown().await;
    result
}

/// File configuration with command-line overrides applied
fn build_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    if let Some(root) = &cli.proc_root {
        config = config.with_proc_root(root);
    }
    if let Some(socket) = &cli.docker_socket {
        config = config.with_docker_socket(socket);
    }
    if cli.no_runtime {
        config = config.with_runtime(false);
    }

    Ok(config)
}
