// src/main.rs

//! The main entry point for the cacheproxy server application.

use anyhow::Result;
use cacheproxy::config::Config;
use cacheproxy::server;
use std::env;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    const VERSION: &str = env!("CARGO_PKG_VERSION");
    if args.contains(&"--version".to_string()) {
        println!("cacheproxy version {VERSION}");
        return Ok(());
    }

    // Configuration file path, optionally given with --config; the file
    // itself is optional, since every option has a built-in default and
    // may arrive entirely via environment variables.
    let config_path = args
        .iter()
        .position(|arg| arg == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config = match Config::load(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("failed to load configuration: {e:#}");
            std::process::exit(1);
        }
    };

    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .compact()
        .with_ansi(true)
        .init();

    if let Err(e) = server::run(config).await {
        error!(error = %e, "server runtime error");
        return Err(e);
    }

    Ok(())
}
