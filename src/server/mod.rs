// src/server/mod.rs

//! Assembles and runs the proxy server: configuration is already loaded by
//! the caller, `setup` builds the shared `AppState` and binds the listening
//! socket, `spawner` starts background tasks (the Monitor), and
//! `connection_loop::run` is the accept loop that runs until shutdown.

pub mod connection_loop;
pub mod context;
pub mod initialization;
pub mod spawner;

use anyhow::Result;

use crate::config::Config;

/// Runs the proxy to completion: binds the listener, spawns the Monitor
/// task, then runs the accept loop until a shutdown signal arrives and all
/// in-flight connections have drained.
pub async fn run(config: Config) -> Result<()> {
    let mut ctx = initialization::setup(config).await?;
    spawner::spawn_all(&mut ctx).await?;
    connection_loop::run(ctx).await;
    Ok(())
}
