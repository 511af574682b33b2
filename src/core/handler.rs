// src/core/handler.rs

//! Per-connection request handling: the CLASSIFY / FORWARD / CACHED / STATS
//! / REPLY state machine described for the data plane.

use std::sync::Arc;
use tracing::{error, info};

use crate::core::cache::entry::CacheEntry;
use crate::core::cache::manager::CacheManager;
use crate::core::errors::ProxyError;
use crate::core::filter::RequestFilter;
use crate::core::http::request::Request;
use crate::core::http::response::Response;
use crate::core::pool::ConnectionPool;
use crate::core::stats::Statistics;

const STATS_PATH: &str = "/proxy-stats";

pub struct RequestHandler {
    filter: Arc<RequestFilter>,
    cache: Arc<CacheManager>,
    pool: Arc<ConnectionPool>,
    stats: Arc<Statistics>,
    compression_enabled: bool,
}

impl RequestHandler {
    pub fn new(
        filter: Arc<RequestFilter>,
        cache: Arc<CacheManager>,
        pool: Arc<ConnectionPool>,
        stats: Arc<Statistics>,
        compression_enabled: bool,
    ) -> Self {
        Self {
            filter,
            cache,
            pool,
            stats,
            compression_enabled,
        }
    }

    /// Runs the CLASSIFY step and dispatches to the matching state. Never
    /// returns an `Err` — every failure path is converted to an error
    /// `Response` here, matching spec.md's "process never exits on a
    /// per-request error".
    pub async fn handle(&self, request: Request) -> Response {
        self.stats.record_request();
        self.stats.record_method(&request.method);

        if request.target == STATS_PATH {
            return self.stats_response();
        }

        if self.filter.should_filter(&request.target) {
            info!(target = %request.target, method = %request.method, "filtered request");
            return Response::error(403);
        }

        if request.method == "GET" {
            if let Some(entry) = self
                .cache
                .get(&request.method, &request.target, &request.headers, None)
                .await
            {
                return self.compose(&request, entry.status_code, entry.headers, entry.body);
            }
        }

        self.forward(request).await
    }

    async fn forward(&self, request: Request) -> Response {
        match self.pool.execute(&request.target, &request).await {
            Ok((response, url)) => {
                if request.method == "GET" && (200..400).contains(&response.status_code) {
                    let entry = CacheEntry::new(
                        url,
                        response.status_code,
                        response.headers.clone(),
                        response.body.clone(),
                    );
                    self.cache
                        .put(&request.method, &request.target, &request.headers, None, &entry)
                        .await;
                }
                self.stats.record_success();
                self.stats.add_bytes_transferred(response.body.len() as u64);
                self.compose(&request, response.status_code, response.headers, response.body)
            }
            Err(e) => {
                self.stats.record_error();
                error!(error = %e, target = %request.target, "forwarding failed");
                let status = match e {
                    ProxyError::OriginTimeout => 504,
                    ProxyError::OriginTransport(_) => 502,
                    ProxyError::MalformedRequest(_) => 400,
                    _ => 500,
                };
                Response::error(status)
            }
        }
    }

    fn compose(&self, request: &Request, status_code: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Response {
        let mut response = Response::new(status_code, headers, body);
        let accept_encoding = request.header("Accept-Encoding").unwrap_or("");
        if let Err(e) = response.maybe_compress(self.compression_enabled, accept_encoding) {
            error!(error = %e, "response compression failed, serving uncompressed");
        }
        response
    }

    fn stats_response(&self) -> Response {
        let snapshot = self.stats.snapshot();
        let body = serde_json::to_vec_pretty(&snapshot).unwrap_or_default();
        Response::new(
            200,
            vec![("Content-Type".to_string(), "application/json".to_string())],
            body,
        )
    }
}
