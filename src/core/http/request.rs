// src/core/http/request.rs

//! Request parsing and framing.
//!
//! `RequestCodec` is a `tokio_util::codec::Decoder`: `decode` returns
//! `Ok(None)` when the buffer doesn't yet hold a complete request and
//! advances the buffer only once a full request (headers plus any declared
//! body) is available, mirroring the accumulate-then-advance shape of a
//! frame codec.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

use crate::core::errors::ProxyError;

/// Requests with a header block larger than this are rejected as malformed
/// rather than allowed to grow the buffer without bound.
const MAX_HEADER_BYTES: usize = 64 * 1024;
/// Hard cap on a declared body size, to keep a bad `Content-Length` from
/// pinning arbitrary amounts of memory.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    /// The request target as sent on the wire: either an absolute path
    /// (`/widgets`) or, for requests already naming a full URL, that URL
    /// unchanged.
    pub target: String,
    pub version: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// The peer's address, filled in by the dispatcher after the codec
    /// produces the frame (the codec itself has no socket access).
    pub client_ip: String,
}

impl Request {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Default)]
pub struct RequestCodec;

impl Decoder for RequestCodec {
    type Item = Request;
    type Error = ProxyError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Request>, ProxyError> {
        let header_end = match find_subslice(src, b"\r\n\r\n") {
            Some(pos) => pos,
            None => {
                if src.len() > MAX_HEADER_BYTES {
                    return Err(ProxyError::MalformedRequest(
                        "header block exceeds maximum size".to_string(),
                    ));
                }
                return Ok(None);
            }
        };

        let header_block = &src[..header_end];
        let (method, target, version, headers) = parse_head(header_block)?;

        let body_start = header_end + 4;
        let content_length = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
            .map(|(_, v)| v.trim().parse::<usize>())
            .transpose()
            .map_err(|_| ProxyError::MalformedRequest("invalid Content-Length".to_string()))?;
        let is_chunked = headers
            .iter()
            .any(|(k, v)| k.eq_ignore_ascii_case("transfer-encoding") && v.to_lowercase().contains("chunked"));

        let (body, total_len) = if is_chunked {
            match dechunk(&src[body_start..])? {
                Some((body, consumed)) => (body, body_start + consumed),
                None => return Ok(None),
            }
        } else if let Some(len) = content_length {
            if len > MAX_BODY_BYTES {
                return Err(ProxyError::MalformedRequest(
                    "Content-Length exceeds maximum body size".to_string(),
                ));
            }
            if src.len() < body_start + len {
                return Ok(None);
            }
            (src[body_start..body_start + len].to_vec(), body_start + len)
        } else {
            (Vec::new(), body_start)
        };

        src.advance(total_len);

        Ok(Some(Request {
            method,
            target,
            version,
            headers,
            body,
            client_ip: String::new(),
        }))
    }
}

fn parse_head(block: &[u8]) -> Result<(String, String, String, Vec<(String, String)>), ProxyError> {
    let text = String::from_utf8_lossy(block);
    let mut lines = text.split("\r\n");

    let request_line = lines
        .next()
        .ok_or_else(|| ProxyError::MalformedRequest("empty request".to_string()))?;
    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| ProxyError::MalformedRequest("missing method".to_string()))?
        .to_string();
    let target = parts
        .next()
        .ok_or_else(|| ProxyError::MalformedRequest("missing request target".to_string()))?
        .to_string();
    let version = parts
        .next()
        .unwrap_or("HTTP/1.1")
        .to_string();

    let mut headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        match line.split_once(':') {
            Some((name, value)) => headers.push((name.trim().to_string(), value.trim().to_string())),
            None => continue,
        }
    }

    Ok((method, target, version, headers))
}

/// Decodes an RFC 7230 §4.1 chunked body. Returns `Ok(None)` if the
/// terminating zero-length chunk hasn't arrived yet.
fn dechunk(mut data: &[u8]) -> Result<Option<(Vec<u8>, usize)>, ProxyError> {
    let mut out = Vec::new();
    let mut consumed = 0usize;

    loop {
        let line_end = match find_subslice(data, b"\r\n") {
            Some(pos) => pos,
            None => return Ok(None),
        };
        let size_line = std::str::from_utf8(&data[..line_end])
            .map_err(|_| ProxyError::MalformedRequest("invalid chunk size".to_string()))?;
        let size_str = size_line.split(';').next().unwrap_or("").trim();
        let size = usize::from_str_radix(size_str, 16)
            .map_err(|_| ProxyError::MalformedRequest("invalid chunk size".to_string()))?;

        let chunk_start = line_end + 2;
        if size == 0 {
            // Trailing headers (if any) end with a bare CRLF; we don't
            // support trailers, just require the terminating blank line.
            if data.len() < chunk_start + 2 {
                return Ok(None);
            }
            consumed += chunk_start + 2;
            return Ok(Some((out, consumed)));
        }

        if data.len() < chunk_start + size + 2 {
            return Ok(None);
        }
        out.extend_from_slice(&data[chunk_start..chunk_start + size]);
        let advance = chunk_start + size + 2;
        consumed += advance;
        data = &data[advance..];
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_simple_get_request() {
        let mut buf = BytesMut::from(&b"GET /widgets HTTP/1.1\r\nHost: example.com\r\n\r\n"[..]);
        let mut codec = RequestCodec;
        let req = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.target, "/widgets");
        assert_eq!(req.header("Host"), Some("example.com"));
        assert!(req.body.is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn waits_for_more_data_on_partial_headers() {
        let mut buf = BytesMut::from(&b"GET /widgets HTTP/1.1\r\nHost: exam"[..]);
        let mut codec = RequestCodec;
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn reads_exact_content_length_body() {
        let mut buf = BytesMut::from(
            &b"POST /widgets HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello"[..],
        );
        let mut codec = RequestCodec;
        let req = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(req.body, b"hello");
        assert!(buf.is_empty());
    }

    #[test]
    fn waits_for_more_data_when_body_is_incomplete() {
        let mut buf = BytesMut::from(&b"POST /widgets HTTP/1.1\r\nContent-Length: 10\r\n\r\nhel"[..]);
        let mut codec = RequestCodec;
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn decodes_chunked_body() {
        let mut buf = BytesMut::from(
            &b"POST /w HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n"[..],
        );
        let mut codec = RequestCodec;
        let req = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(req.body, b"hello");
        assert!(buf.is_empty());
    }

    #[test]
    fn rejects_request_without_a_method() {
        let mut buf = BytesMut::from(&b"\r\n\r\n"[..]);
        let mut codec = RequestCodec;
        assert!(codec.decode(&mut buf).is_err());
    }
}
