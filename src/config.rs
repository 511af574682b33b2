// src/config.rs

//! Configuration loading: built-in defaults, an optional TOML file, and an
//! environment-variable overlay, matching the option table the proxy has
//! always exposed.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;

/// Immutable, process-wide configuration record. Held behind an `Arc` and
/// handed to every task once assembled at startup.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_thread_pool_size")]
    pub thread_pool_size: usize,
    #[serde(default = "default_request_queue_size")]
    pub request_queue_size: usize,
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,
    #[serde(default = "default_redis_host")]
    pub redis_host: String,
    #[serde(default = "default_redis_port")]
    pub redis_port: u16,
    #[serde(default = "default_redis_db")]
    pub redis_db: u32,
    #[serde(default = "default_cache_expiration")]
    pub cache_expiration_secs: u64,
    #[serde(default = "default_backend_servers")]
    pub backend_servers: Vec<String>,
    #[serde(default = "default_enable_compression")]
    pub enable_compression: bool,
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests: u64,
    #[serde(default = "default_rate_limit_window")]
    pub rate_limit_window_secs: i64,
    #[serde(default = "default_request_filters")]
    pub request_filters: Vec<String>,
    /// Whether the per-origin client verifies TLS certificates. The
    /// original proxy always disabled verification; here that behavior is
    /// an explicit opt-out rather than the default.
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_thread_pool_size() -> usize {
    50
}
fn default_request_queue_size() -> usize {
    100
}
fn default_connection_timeout() -> u64 {
    30
}
fn default_redis_host() -> String {
    "localhost".to_string()
}
fn default_redis_port() -> u16 {
    6379
}
fn default_redis_db() -> u32 {
    0
}
fn default_cache_expiration() -> u64 {
    300
}
fn default_backend_servers() -> Vec<String> {
    vec!["http://localhost:8000".to_string()]
}
fn default_enable_compression() -> bool {
    true
}
fn default_rate_limit_requests() -> u64 {
    100
}
fn default_rate_limit_window() -> i64 {
    60
}
fn default_request_filters() -> Vec<String> {
    vec!["ads".to_string(), "trackers".to_string(), "malware".to_string()]
}
fn default_tls_verify() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            thread_pool_size: default_thread_pool_size(),
            request_queue_size: default_request_queue_size(),
            connection_timeout_secs: default_connection_timeout(),
            redis_host: default_redis_host(),
            redis_port: default_redis_port(),
            redis_db: default_redis_db(),
            cache_expiration_secs: default_cache_expiration(),
            backend_servers: default_backend_servers(),
            enable_compression: default_enable_compression(),
            rate_limit_requests: default_rate_limit_requests(),
            rate_limit_window_secs: default_rate_limit_window(),
            request_filters: default_request_filters(),
            tls_verify: default_tls_verify(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Loads defaults, overlays an optional TOML file, then overlays
    /// environment variables, mirroring the original proxy's direct
    /// `os.environ` lookups (no prefix, one variable per option).
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file at '{path}'"))?;
        toml::from_str(&contents).with_context(|| format!("failed to parse TOML from '{path}'"))
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(v) = env::var("HOST") {
            self.host = v;
        }
        if let Ok(v) = env::var("PORT") {
            self.port = v.parse().context("invalid PORT")?;
        }
        if let Ok(v) = env::var("THREAD_POOL_SIZE") {
            self.thread_pool_size = v.parse().context("invalid THREAD_POOL_SIZE")?;
        }
        if let Ok(v) = env::var("REQUEST_QUEUE_SIZE") {
            self.request_queue_size = v.parse().context("invalid REQUEST_QUEUE_SIZE")?;
        }
        if let Ok(v) = env::var("CONNECTION_TIMEOUT") {
            self.connection_timeout_secs = v.parse().context("invalid CONNECTION_TIMEOUT")?;
        }
        if let Ok(v) = env::var("REDIS_HOST") {
            self.redis_host = v;
        }
        if let Ok(v) = env::var("REDIS_PORT") {
            self.redis_port = v.parse().context("invalid REDIS_PORT")?;
        }
        if let Ok(v) = env::var("REDIS_DB") {
            self.redis_db = v.parse().context("invalid REDIS_DB")?;
        }
        if let Ok(v) = env::var("CACHE_EXPIRATION") {
            self.cache_expiration_secs = v.parse().context("invalid CACHE_EXPIRATION")?;
        }
        if let Ok(v) = env::var("BACKEND_SERVERS") {
            self.backend_servers = split_csv(&v);
        }
        if let Ok(v) = env::var("ENABLE_COMPRESSION") {
            self.enable_compression = parse_bool(&v)?;
        }
        if let Ok(v) = env::var("RATE_LIMIT_REQUESTS") {
            self.rate_limit_requests = v.parse().context("invalid RATE_LIMIT_REQUESTS")?;
        }
        if let Ok(v) = env::var("RATE_LIMIT_WINDOW") {
            self.rate_limit_window_secs = v.parse().context("invalid RATE_LIMIT_WINDOW")?;
        }
        if let Ok(v) = env::var("REQUEST_FILTERS") {
            self.request_filters = split_csv(&v);
        }
        if let Ok(v) = env::var("TLS_VERIFY") {
            self.tls_verify = parse_bool(&v)?;
        }
        if let Ok(v) = env::var("LOG_LEVEL") {
            self.log_level = v;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(anyhow!("port cannot be 0"));
        }
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }
        if self.thread_pool_size == 0 {
            return Err(anyhow!("thread_pool_size cannot be 0"));
        }
        if self.request_queue_size == 0 {
            return Err(anyhow!("request_queue_size cannot be 0"));
        }
        if self.backend_servers.is_empty() {
            return Err(anyhow!("backend_servers cannot be empty"));
        }
        Ok(())
    }

    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/{}", self.redis_host, self.redis_port, self.redis_db)
    }
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("invalid boolean value '{other}'")),
    }
}
