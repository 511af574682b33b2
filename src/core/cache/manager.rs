// src/core/cache/manager.rs

//! Redis-backed storage and retrieval of cached responses.

use futures::StreamExt;
use redis::AsyncCommands;
use std::sync::Arc;
use tracing::{error, warn};

use crate::core::cache::entry::CacheEntry;
use crate::core::cache::key::CacheKey;
use crate::core::errors::ProxyError;
use crate::core::stats::Statistics;

/// Caches GET responses under their content-addressed `CacheKey`. Non-GET
/// requests are never looked up or stored, matching the original's
/// "only cache GET requests by default".
#[derive(Debug, Clone)]
pub struct CacheManager {
    client: redis::Client,
    expiration_secs: u64,
    stats: Arc<Statistics>,
}

impl CacheManager {
    pub fn new(client: redis::Client, expiration_secs: u64, stats: Arc<Statistics>) -> Self {
        Self {
            client,
            expiration_secs,
            stats,
        }
    }

    /// Looks up a cached response for `method`/`url`/`headers`/`body`.
    /// Always misses for non-GET methods.
    pub async fn get(
        &self,
        method: &str,
        url: &str,
        headers: &[(String, String)],
        body: Option<&[u8]>,
    ) -> Option<CacheEntry> {
        if method != "GET" {
            return None;
        }
        let key = CacheKey::compute(method, url, headers, body);
        match self.fetch(&key).await {
            Ok(Some(entry)) => {
                self.stats.record_cache_hit();
                Some(entry)
            }
            Ok(None) => {
                self.stats.record_cache_miss();
                None
            }
            Err(e) => {
                error!(error = %e, key = %key, "cache lookup failed");
                self.stats.record_cache_miss();
                None
            }
        }
    }

    async fn fetch(&self, key: &CacheKey) -> Result<Option<CacheEntry>, ProxyError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(key.as_hex()).await?;
        let Some(raw) = raw else { return Ok(None) };
        match CacheEntry::from_json(&raw) {
            Ok(entry) => Ok(Some(entry)),
            Err(_) => Ok(None),
        }
    }

    /// Stores `entry` under the key for `method`/`url`/`headers`/`body`, if
    /// the response is a cacheable GET response.
    pub async fn put(
        &self,
        method: &str,
        url: &str,
        headers: &[(String, String)],
        body: Option<&[u8]>,
        entry: &CacheEntry,
    ) {
        if method != "GET" {
            return;
        }
        if !CacheEntry::is_cacheable(entry.status_code, &entry.headers) {
            return;
        }
        let key = CacheKey::compute(method, url, headers, body);
        if let Err(e) = self.store(&key, entry).await {
            error!(error = %e, key = %key, "failed to cache response");
        }
    }

    async fn store(&self, key: &CacheKey, entry: &CacheEntry) -> Result<(), ProxyError> {
        let json = entry
            .to_json()
            .map_err(|e| ProxyError::Internal(e.to_string()))?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(key.as_hex(), json, self.expiration_secs).await?;
        Ok(())
    }

    /// Invalidates every cache entry (`url_pattern = None`) or every entry
    /// whose stored URL contains `url_pattern`. Not reachable from any
    /// request path; intended for operational/administrative use.
    pub async fn invalidate(&self, url_pattern: Option<&str>) -> Result<u64, ProxyError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let keys: Vec<String> = conn.scan().await?.collect().await;
        let mut removed = 0u64;
        for key in keys {
            let matches = match url_pattern {
                None => true,
                Some(pattern) => match conn.get::<_, Option<String>>(&key).await {
                    Ok(Some(raw)) => CacheEntry::from_json(&raw)
                        .map(|entry| entry.url.contains(pattern))
                        .unwrap_or(false),
                    _ => false,
                },
            };
            if matches {
                if let Err(e) = conn.del::<_, ()>(&key).await {
                    warn!(error = %e, key, "failed to delete cache entry during invalidation");
                    continue;
                }
                removed += 1;
            }
        }
        Ok(removed)
    }
}
