//! Bud - personal assistant tool gateway
//!
//! Main entry point for the Bud CLI.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use bud_config::{GatewayConfig, LoggingConfig};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;

mod builtin;
mod commands;
mod gateway;

use commands::{serve, tools};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Bud - personal assistant tool gateway
#[derive(Parser)]
#[command(name = "bud")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to config file (overrides default discovery)
    #[arg(long, global = true, env = "BUD_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve tools to an MCP client over stdio or HTTP
    Serve(serve::ServeArgs),

    /// List every tool the gateway would serve, then exit
    Tools(tools::ToolsArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, warnings) = load_config(cli.config.as_ref())?;
    let _guard = init_tracing(cli.verbose, &config.logging())?;

    for warning in &warnings {
        tracing::warn!("{}", warning);
    }

    let ctx = commands::Context {
        config,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Serve(args) => serve::run(args, &ctx).await,
        Commands::Tools(args) => tools::run(args, &ctx).await,
    }
}

/// An explicit `--config` file is loaded alone; otherwise user and project
/// layers are discovered and merged.
fn load_config(path: Option<&PathBuf>) -> Result<(GatewayConfig, Vec<String>)> {
    match path {
        Some(path) => {
            let config = bud_config::load_config_file(path)
                .with_context(|| format!("loading {}", path.display()))?;
            Ok((config, Vec::new()))
        }
        None => {
            let loaded = bud_config::load_config(None)?;
            Ok((loaded.config, loaded.warnings))
        }
    }
}

/// Console logs go to stderr, since stdout carries the protocol in stdio
/// mode. The JSON file layer is optional.
fn init_tracing(verbose: bool, logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = if verbose {
        "bud=debug,bud_mcp=debug,bud_server=debug,bud_config=debug,info"
    } else {
        "bud=info,bud_mcp=info,bud_server=info,warn"
    };

    let console = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)));

    let (file, guard) = if logging.file {
        std::fs::create_dir_all(&logging.dir)
            .with_context(|| format!("creating log directory {}", logging.dir.display()))?;
        let appender = tracing_appender::rolling::daily(&logging.dir, "bud.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_filter(EnvFilter::new(
                "bud=trace,bud_mcp=trace,bud_server=trace,bud_config=trace,info",
            ));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry().with(console).with(file).init();

    Ok(guard)
}
