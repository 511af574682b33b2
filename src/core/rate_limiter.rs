// src/core/rate_limiter.rs

//! Redis-backed sliding-window rate limiter.

use std::time::{SystemTime, UNIX_EPOCH};
use tracing::error;

use crate::core::errors::ProxyError;

/// Enforces a per-client sliding-window request cap using a Redis sorted
/// set keyed `rate_limit:<client_ip>`, with one member per accepted request
/// scored by its arrival second.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    client: redis::Client,
    requests_limit: u64,
    time_window_secs: i64,
}

impl RateLimiter {
    pub fn new(client: redis::Client, requests_limit: u64, time_window_secs: i64) -> Self {
        Self {
            client,
            requests_limit,
            time_window_secs,
        }
    }

    /// Returns `true` if `client_ip` has exceeded its request budget for the
    /// configured window. On a Redis error this fails open (logs and
    /// returns `false`) so a store outage does not take the proxy down.
    pub async fn is_rate_limited(&self, client_ip: &str) -> bool {
        match self.check(client_ip).await {
            Ok(limited) => limited,
            Err(e) => {
                error!(error = %e, client_ip, "rate limiter store error, failing open");
                false
            }
        }
    }

    async fn check(&self, client_ip: &str) -> Result<bool, ProxyError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;
        let key = format!("rate_limit:{client_ip}");
        let cutoff = now - self.time_window_secs;

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let (_, _, request_count, _): (i64, i64, u64, bool) = redis::pipe()
            .atomic()
            .zrembyscore(&key, 0, cutoff)
            .zadd(&key, now.to_string(), now)
            .zcard(&key)
            .expire(&key, self.time_window_secs)
            .query_async(&mut conn)
            .await?;

        Ok(request_count > self.requests_limit)
    }
}
