// src/server/spawner.rs

//! Spawns the server's background tasks into the shared `JoinSet`.

use anyhow::Result;
use std::time::Duration;
use tokio::time::interval;
use tracing::info;

use super::context::ServerContext;

const MONITOR_INTERVAL: Duration = Duration::from_secs(60);

/// Spawns the Monitor task: every 60 seconds, logs the Statistics snapshot
/// as a single JSON document at INFO. Runs for the server's lifetime and
/// stops on the shutdown signal.
pub async fn spawn_all(ctx: &mut ServerContext) -> Result<()> {
    let state = ctx.state.clone();
    let mut shutdown_rx = ctx.shutdown_tx.subscribe();

    ctx.background_tasks.spawn(async move {
        let mut ticker = interval(MONITOR_INTERVAL);
        ticker.tick().await; // first tick fires immediately; skip it
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let snapshot = state.stats.snapshot();
                    match serde_json::to_string(&snapshot) {
                        Ok(json) => info!(stats = %json, "periodic statistics snapshot"),
                        Err(e) => tracing::error!(error = %e, "failed to serialize statistics snapshot"),
                    }
                }
                _ = shutdown_rx.recv() => break,
            }
        }
        Ok(())
    });

    Ok(())
}
