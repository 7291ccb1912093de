//! Thirdeye server binary
//!
//! Loads the TOML configuration and serves the confidence pipeline over HTTP.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process;
use thirdeye_server::{config::ServerConfig, start_server};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Evidence confidence server
#[derive(Parser, Debug)]
#[command(name = "thirdeye-server")]
#[command(version, about = "Evidence confidence pipeline HTTP server", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "THIRDEYE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured bind port
    #[arg(short = 'p', long)]
    bind_port: Option<u16>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run(Args::parse()).await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => {
            warn!("No config file specified, using defaults");
            ServerConfig::default()
        }
    };

    if let Some(port) = args.bind_port {
        config.bind_port = port;
    }

    start_server(config).await?;
    Ok(())
}
