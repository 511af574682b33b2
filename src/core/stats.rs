// src/core/stats.rs

//! Server-wide operational counters, exposed via `GET /proxy-stats`.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

/// Fixed set of named atomic counters, one field per entry in the
/// Counters record. Every request contributes to exactly one of
/// `requests_success`/`requests_error`, plus one method counter and
/// (for GET) one cache counter.
#[derive(Debug)]
pub struct Statistics {
    start_time: Instant,
    requests_total: AtomicU64,
    requests_success: AtomicU64,
    requests_error: AtomicU64,
    bytes_transferred: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    active_connections: AtomicI64,
    rate_limited_requests: AtomicU64,
    method_get: AtomicU64,
    method_post: AtomicU64,
    method_put: AtomicU64,
    method_delete: AtomicU64,
    method_other: AtomicU64,
}

/// A point-in-time, JSON-serializable view of `Statistics`, as returned by
/// `GET /proxy-stats`.
#[derive(Debug, Serialize)]
pub struct StatsSnapshot {
    pub requests_total: u64,
    pub requests_success: u64,
    pub requests_error: u64,
    pub bytes_transferred: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub active_connections: i64,
    pub rate_limited_requests: u64,
    pub uptime_seconds: f64,
    pub cache_hit_ratio: f64,
    pub requests_by_method: MethodCounts,
}

#[derive(Debug, Serialize)]
pub struct MethodCounts {
    #[serde(rename = "GET")]
    pub get: u64,
    #[serde(rename = "POST")]
    pub post: u64,
    #[serde(rename = "PUT")]
    pub put: u64,
    #[serde(rename = "DELETE")]
    pub delete: u64,
    #[serde(rename = "OTHER")]
    pub other: u64,
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}

impl Statistics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            requests_total: AtomicU64::new(0),
            requests_success: AtomicU64::new(0),
            requests_error: AtomicU64::new(0),
            bytes_transferred: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            active_connections: AtomicI64::new(0),
            rate_limited_requests: AtomicU64::new(0),
            method_get: AtomicU64::new(0),
            method_post: AtomicU64::new(0),
            method_put: AtomicU64::new(0),
            method_delete: AtomicU64::new(0),
            method_other: AtomicU64::new(0),
        }
    }

    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.requests_success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.requests_error.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limited(&self) {
        self.rate_limited_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_bytes_transferred(&self, n: u64) {
        self.bytes_transferred.fetch_add(n, Ordering::Relaxed);
    }

    pub fn connection_opened(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    /// Maps anything other than GET/POST/PUT/DELETE to the OTHER counter.
    pub fn record_method(&self, method: &str) {
        let counter = match method {
            "GET" => &self.method_get,
            "POST" => &self.method_post,
            "PUT" => &self.method_put,
            "DELETE" => &self.method_delete,
            _ => &self.method_other,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        let total_lookups = hits + misses;
        let cache_hit_ratio = if total_lookups > 0 {
            hits as f64 / total_lookups as f64
        } else {
            0.0
        };

        StatsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_success: self.requests_success.load(Ordering::Relaxed),
            requests_error: self.requests_error.load(Ordering::Relaxed),
            bytes_transferred: self.bytes_transferred.load(Ordering::Relaxed),
            cache_hits: hits,
            cache_misses: misses,
            active_connections: self.active_connections.load(Ordering::Relaxed),
            rate_limited_requests: self.rate_limited_requests.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs_f64(),
            cache_hit_ratio,
            requests_by_method: MethodCounts {
                get: self.method_get.load(Ordering::Relaxed),
                post: self.method_post.load(Ordering::Relaxed),
                put: self.method_put.load(Ordering::Relaxed),
                delete: self.method_delete.load(Ordering::Relaxed),
                other: self.method_other.load(Ordering::Relaxed),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_hit_ratio_is_zero_with_no_lookups() {
        let stats = Statistics::new();
        assert_eq!(stats.snapshot().cache_hit_ratio, 0.0);
    }

    #[test]
    fn cache_hit_ratio_reflects_hits_and_misses() {
        let stats = Statistics::new();
        stats.record_cache_hit();
        stats.record_cache_hit();
        stats.record_cache_hit();
        stats.record_cache_miss();
        assert_eq!(stats.snapshot().cache_hit_ratio, 0.75);
    }

    #[test]
    fn unknown_methods_fall_into_other() {
        let stats = Statistics::new();
        stats.record_method("PATCH");
        stats.record_method("GET");
        let snap = stats.snapshot();
        assert_eq!(snap.requests_by_method.other, 1);
        assert_eq!(snap.requests_by_method.get, 1);
    }

    #[test]
    fn active_connections_tracks_open_and_close() {
        let stats = Statistics::new();
        stats.connection_opened();
        stats.connection_opened();
        stats.connection_closed();
        assert_eq!(stats.snapshot().active_connections, 1);
    }
}
