// src/core/cache/key.rs

//! Content-addressed cache key derivation.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// A 32-byte SHA-256 digest over a request's method, URL, a fixed subset of
/// its headers, and (for non-GET methods) its body, rendered as 64 lowercase
/// hex characters. Headers outside {accept, accept-language, accept-encoding}
/// never affect the key, so two requests differing only in e.g.
/// `X-Request-Id` collapse to the same cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

const RELEVANT_HEADERS: [&str; 3] = ["accept", "accept-language", "accept-encoding"];

impl CacheKey {
    pub fn compute(method: &str, url: &str, headers: &[(String, String)], body: Option<&[u8]>) -> Self {
        let mut relevant: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in headers {
            let lower = name.to_lowercase();
            if RELEVANT_HEADERS.contains(&lower.as_str()) {
                relevant.insert(lower, value.clone());
            }
        }

        // A canonical, order-independent encoding of the key components -
        // a BTreeMap serializes with sorted keys, standing in for the
        // original's `json.dumps(..., sort_keys=True)`.
        let mut canonical = serde_json::Map::new();
        canonical.insert("method".to_string(), serde_json::Value::String(method.to_string()));
        canonical.insert("url".to_string(), serde_json::Value::String(url.to_string()));
        canonical.insert(
            "headers".to_string(),
            serde_json::to_value(&relevant).unwrap_or(serde_json::Value::Null),
        );
        if method != "GET" {
            if let Some(body) = body {
                if !body.is_empty() {
                    canonical.insert(
                        "body".to_string(),
                        serde_json::Value::String(String::from_utf8_lossy(body).into_owned()),
                    );
                }
            }
        }

        let encoded = serde_json::Value::Object(canonical).to_string();
        let mut hasher = Sha256::new();
        hasher.update(encoded.as_bytes());
        let digest: [u8; 32] = hasher.finalize().into();
        Self(digest)
    }

    pub fn as_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_produce_same_key() {
        let headers = vec![("Accept".to_string(), "text/html".to_string())];
        let a = CacheKey::compute("GET", "/widgets", &headers, None);
        let b = CacheKey::compute("GET", "/widgets", &headers, None);
        assert_eq!(a.as_hex(), b.as_hex());
        assert_eq!(a.as_hex().len(), 64);
    }

    #[test]
    fn irrelevant_headers_do_not_affect_the_key() {
        let a = CacheKey::compute(
            "GET",
            "/widgets",
            &[("X-Request-Id".to_string(), "abc".to_string())],
            None,
        );
        let b = CacheKey::compute(
            "GET",
            "/widgets",
            &[("X-Request-Id".to_string(), "xyz".to_string())],
            None,
        );
        assert_eq!(a.as_hex(), b.as_hex());
    }

    #[test]
    fn relevant_headers_change_the_key() {
        let a = CacheKey::compute(
            "GET",
            "/widgets",
            &[("Accept".to_string(), "text/html".to_string())],
            None,
        );
        let b = CacheKey::compute(
            "GET",
            "/widgets",
            &[("Accept".to_string(), "application/json".to_string())],
            None,
        );
        assert_ne!(a.as_hex(), b.as_hex());
    }

    #[test]
    fn body_affects_key_for_non_get_methods() {
        let a = CacheKey::compute("POST", "/widgets", &[], Some(b"one"));
        let b = CacheKey::compute("POST", "/widgets", &[], Some(b"two"));
        assert_ne!(a.as_hex(), b.as_hex());
    }

    #[test]
    fn body_is_ignored_for_get() {
        let a = CacheKey::compute("GET", "/widgets", &[], Some(b"ignored"));
        let b = CacheKey::compute("GET", "/widgets", &[], None);
        assert_eq!(a.as_hex(), b.as_hex());
    }
}
