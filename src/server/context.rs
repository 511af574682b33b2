// src/server/context.rs

//! Shared application state and the bundle of resources the main loop needs.

use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;

use crate::config::Config;
use crate::core::cache::manager::CacheManager;
use crate::core::filter::RequestFilter;
use crate::core::pool::ConnectionPool;
use crate::core::rate_limiter::RateLimiter;
use crate::core::stats::Statistics;

/// Every shared component a `RequestHandler` needs, assembled once at
/// startup and handed around behind an `Arc`.
pub struct AppState {
    pub config: Arc<Config>,
    pub stats: Arc<Statistics>,
    pub filter: Arc<RequestFilter>,
    pub rate_limiter: Arc<RateLimiter>,
    pub cache: Arc<CacheManager>,
    pub pool: Arc<ConnectionPool>,
}

/// Holds all the initialized state required to run the server's main loop.
pub struct ServerContext {
    pub state: Arc<AppState>,
    pub listener: TcpListener,
    pub shutdown_tx: broadcast::Sender<()>,
    pub background_tasks: JoinSet<anyhow::Result<()>>,
}
