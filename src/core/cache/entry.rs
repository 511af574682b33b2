// src/core/cache/entry.rs

//! The cached-response wire format stored in Redis.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// A cached origin response. The body is always base64-encoded on the wire,
/// collapsing the original format's two decode paths (plain vs.
/// `content_base64`) into one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub url: String,
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    #[serde(with = "base64_body")]
    pub body: Vec<u8>,
}

impl CacheEntry {
    pub fn new(url: String, status_code: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self {
            url,
            status_code,
            headers,
            body,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(data: &str) -> serde_json::Result<Self> {
        serde_json::from_str(data)
    }

    /// Whether the response's own headers forbid storing it.
    pub fn is_cacheable(status_code: u16, headers: &[(String, String)]) -> bool {
        if status_code >= 400 {
            return false;
        }
        let cache_control = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("cache-control"))
            .map(|(_, value)| value.to_lowercase())
            .unwrap_or_default();
        !cache_control.contains("no-store") && !cache_control.contains("no-cache")
    }
}

mod base64_body {
    use super::BASE64;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        BASE64.encode(body).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
