// src/server/initialization.rs

//! Assembles the `ServerContext` from a loaded `Config`: builds the Redis
//! client, the cache/rate-limiter/pool/filter components, and binds the
//! listening socket.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::info;

use crate::config::Config;
use crate::core::cache::manager::CacheManager;
use crate::core::filter::RequestFilter;
use crate::core::pool::ConnectionPool;
use crate::core::rate_limiter::RateLimiter;
use crate::core::stats::Statistics;

use super::context::{AppState, ServerContext};

pub async fn setup(config: Config) -> Result<ServerContext> {
    info!(host = %config.host, port = config.port, "starting cacheproxy");

    let redis_client = redis::Client::open(config.redis_url().as_str())
        .context("failed to build redis client")?;

    let stats = Arc::new(Statistics::new());
    let filter = Arc::new(RequestFilter::new(config.request_filters.clone()));
    let rate_limiter = Arc::new(RateLimiter::new(
        redis_client.clone(),
        config.rate_limit_requests,
        config.rate_limit_window_secs,
    ));
    let cache = Arc::new(CacheManager::new(
        redis_client,
        config.cache_expiration_secs,
        Arc::clone(&stats),
    ));
    let pool = Arc::new(ConnectionPool::new(
        config.backend_servers.clone(),
        Duration::from_secs(config.connection_timeout_secs),
        config.tls_verify,
        10,
    )?);

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;

    let (shutdown_tx, _) = broadcast::channel(1);

    let state = Arc::new(AppState {
        config: Arc::new(config),
        stats,
        filter,
        rate_limiter,
        cache,
        pool,
    });

    Ok(ServerContext {
        state,
        listener,
        shutdown_tx,
        background_tasks: JoinSet::new(),
    })
}
