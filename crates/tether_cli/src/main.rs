//! Tether CLI
//!
//! Connectivity checks and readiness probes for Tether backends.
//!
//! # Commands
//!
//! - `check` - Connect, report backend health once, and disconnect
//! - `serve` - Connect and serve `/livez`, `/readyz` and `/health`
//! - `version` - Show version information

mod commands;
mod config;

use clap::{Parser, Subcommand};
use config::{Overrides, TetherConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Tether connector tools.
#[derive(Parser)]
#[command(name = "tether")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Document-store URI (overrides the file)
    #[arg(global = true, long)]
    mongo_uri: Option<String>,

    /// Cache-store URL (overrides the file)
    #[arg(global = true, long)]
    redis_url: Option<String>,

    /// Cache reconnect retry ceiling
    #[arg(global = true, long)]
    max_retries: Option<u32>,

    /// Cache reconnect backoff step in milliseconds
    #[arg(global = true, long)]
    retry_interval_ms: Option<u64>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to every backend and report health once
    Check {
        /// How long to wait for backends to become ready, in milliseconds
        #[arg(short, long, default_value = "3000")]
        wait_ms: u64,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Serve health probes until Ctrl-C
    Serve {
        /// Address to listen on (overrides the file)
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let overrides = Overrides {
        mongo_uri: cli.mongo_uri,
        redis_url: cli.redis_url,
        max_retries: cli.max_retries,
        retry_interval_ms: cli.retry_interval_ms,
    };

    match cli.command {
        Commands::Check { wait_ms, format } => {
            let config = TetherConfig::load(cli.config.as_deref())?.apply(overrides);
            commands::check::run(&config, Duration::from_millis(wait_ms), &format).await?;
        }
        Commands::Serve { bind } => {
            let mut config = TetherConfig::load(cli.config.as_deref())?.apply(overrides);
            if let Some(bind) = bind {
                config.probe.bind_addr = bind;
            }
            commands::serve::run(&config).await?;
        }
        Commands::Version => {
            println!("Tether CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Tether Core v{}", tether_core::VERSION);
        }
    }

    Ok(())
}
