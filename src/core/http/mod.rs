// src/core/http/mod.rs

//! Minimal HTTP/1.1 request framing and response rendering for the data
//! plane. No HTTP/2, no persistent connections, no RFC cache-freshness
//! negotiation — see spec.md Non-goals.

pub mod request;
pub mod response;

pub use request::{Request, RequestCodec};
pub use response::Response;
