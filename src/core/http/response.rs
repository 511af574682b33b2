// src/core/http/response.rs

//! Response rendering: status line, headers, optional gzip, and encoding to
//! bytes ready to write to the client socket.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;

use crate::core::errors::ProxyError;

#[derive(Debug, Clone)]
pub struct Response {
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status_code: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self {
            status_code,
            headers,
            body,
        }
    }

    pub fn error(status_code: u16) -> Self {
        let reason = reason_phrase(status_code);
        let body = format!("<html><body><h1>{status_code} {reason}</h1></body></html>").into_bytes();
        Self {
            status_code,
            headers: vec![
                ("Content-Type".to_string(), "text/html".to_string()),
                ("Connection".to_string(), "close".to_string()),
            ],
            body,
        }
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Gzip-compresses the body in place when all of: compression is
    /// enabled, the body exceeds 1KB, the client requested
    /// `Accept-Encoding: gzip`, and the origin reported a `text/*`
    /// `Content-Type`.
    pub fn maybe_compress(&mut self, compression_enabled: bool, accept_encoding: &str) -> Result<(), ProxyError> {
        if !compression_enabled || self.body.len() <= 1024 || !accept_encoding.contains("gzip") {
            return Ok(());
        }
        let is_text = self
            .header("Content-Type")
            .map(|ct| ct.contains("text"))
            .unwrap_or(false);
        if !is_text {
            return Ok(());
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&self.body)
            .map_err(|e| ProxyError::Internal(e.to_string()))?;
        self.body = encoder.finish().map_err(|e| ProxyError::Internal(e.to_string()))?;
        self.set_header("Content-Encoding", "gzip");
        Ok(())
    }

    pub fn set_header(&mut self, name: &str, value: &str) {
        if let Some(existing) = self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            existing.1 = value.to_string();
        } else {
            self.headers.push((name.to_string(), value.to_string()));
        }
    }

    /// Renders the status line, headers (with `Content-Length` set/
    /// overwritten to match the final body), and body as bytes ready to
    /// write to the socket.
    pub fn encode(mut self) -> Vec<u8> {
        self.set_header("Content-Length", &self.body.len().to_string());

        let reason = reason_phrase(self.status_code);
        let mut out = format!("HTTP/1.1 {} {}\r\n", self.status_code, reason).into_bytes();
        for (name, value) in &self.headers {
            out.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out
    }
}

fn reason_phrase(status_code: u16) -> &'static str {
    http::StatusCode::from_u16(status_code)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_response_has_the_expected_shape() {
        let resp = Response::error(404);
        assert_eq!(resp.status_code, 404);
        assert!(String::from_utf8_lossy(&resp.body).contains("404 Not Found"));
    }

    #[test]
    fn encode_sets_content_length() {
        let resp = Response::new(200, vec![], b"hello".to_vec());
        let encoded = resp.encode();
        let text = String::from_utf8_lossy(&encoded);
        assert!(text.contains("HTTP/1.1 200 OK"));
        assert!(text.contains("Content-Length: 5"));
        assert!(text.ends_with("hello"));
    }

    #[test]
    fn compression_is_skipped_below_threshold() {
        let mut resp = Response::new(
            200,
            vec![("Content-Type".to_string(), "text/plain".to_string())],
            b"short".to_vec(),
        );
        resp.maybe_compress(true, "gzip").unwrap();
        assert!(resp.header("Content-Encoding").is_none());
    }

    #[test]
    fn compression_applies_for_large_text_bodies_when_requested() {
        let body = vec![b'a'; 2048];
        let mut resp = Response::new(
            200,
            vec![("Content-Type".to_string(), "text/plain".to_string())],
            body.clone(),
        );
        resp.maybe_compress(true, "gzip, deflate").unwrap();
        assert_eq!(resp.header("Content-Encoding"), Some("gzip"));
        assert!(resp.body.len() < body.len());
    }

    #[test]
    fn compression_is_skipped_for_non_text_content_type() {
        let mut resp = Response::new(
            200,
            vec![("Content-Type".to_string(), "image/png".to_string())],
            vec![b'a'; 2048],
        );
        resp.maybe_compress(true, "gzip").unwrap();
        assert!(resp.header("Content-Encoding").is_none());
    }
}
