// src/core/pool.rs

//! Per-origin connection pooling and request forwarding to backend servers.

use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::time::Duration;

use crate::core::errors::ProxyError;
use crate::core::http::request::Request;
use crate::core::http::response::Response;

/// One `reqwest::Client` per configured backend origin, each with its own
/// connection pool so that keep-alive connections to one origin never
/// starve another. Origin selection for each forwarded request is uniform
/// random across the configured backends, matching the original's
/// `random.choice(backend_servers)` ("a simple round-robin load balancing
/// strategy" in the source comment, but actually random — preserved as-is,
/// per spec.md's "Behavior under an offline origin... left as-is").
#[derive(Debug, Clone)]
pub struct ConnectionPool {
    backends: Vec<String>,
    clients: HashMap<String, reqwest::Client>,
}

impl ConnectionPool {
    pub fn new(
        backends: Vec<String>,
        connection_timeout: Duration,
        tls_verify: bool,
        max_idle_per_host: usize,
    ) -> Result<Self, ProxyError> {
        let mut clients = HashMap::with_capacity(backends.len());
        for backend in &backends {
            let client = reqwest::Client::builder()
                .timeout(connection_timeout)
                .danger_accept_invalid_certs(!tls_verify)
                .pool_max_idle_per_host(max_idle_per_host)
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .map_err(|e| ProxyError::Internal(e.to_string()))?;
            clients.insert(backend.clone(), client);
        }
        Ok(Self { backends, clients })
    }

    fn select_backend(&self) -> Option<&str> {
        self.backends
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
    }

    /// Forwards `request` to a randomly selected backend (or, if `target` is
    /// already an absolute URL, to that URL directly) and returns the
    /// relayed response along with the full URL that was requested, for use
    /// as the cache entry's `url` field.
    pub async fn execute(&self, target: &str, request: &Request) -> Result<(Response, String), ProxyError> {
        let backend = self
            .select_backend()
            .ok_or_else(|| ProxyError::Internal("no backend servers configured".to_string()))?;
        let client = self
            .clients
            .get(backend)
            .ok_or_else(|| ProxyError::Internal("no client for selected backend".to_string()))?;

        let url = if target.starts_with("http://") || target.starts_with("https://") {
            target.to_string()
        } else {
            format!("{backend}{target}")
        };

        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| ProxyError::MalformedRequest(format!("unsupported method {}", request.method)))?;

        let mut builder = client.request(method, &url);
        for (name, value) in &request.headers {
            if name.eq_ignore_ascii_case("host") {
                continue;
            }
            builder = builder.header(name, value);
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let resp = builder.send().await?;
        let status_code = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = resp.bytes().await?.to_vec();

        Ok((Response::new(status_code, headers, body), url))
    }
}
