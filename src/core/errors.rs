// src/core/errors.rs

//! Defines the primary error type for the proxy data plane.

use thiserror::Error;

/// The main error enum, representing the failures the request-handling
/// pipeline can encounter. Every variant maps to exactly one client-facing
/// status code in `core::handler` (see spec.md §7).
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("client read timed out")]
    ClientTimeout,

    #[error("origin request timed out")]
    OriginTimeout,

    #[error("origin transport error: {0}")]
    OriginTransport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<redis::RedisError> for ProxyError {
    fn from(e: redis::RedisError) -> Self {
        ProxyError::Store(e.to_string())
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProxyError::OriginTimeout
        } else {
            ProxyError::OriginTransport(e.to_string())
        }
    }
}
