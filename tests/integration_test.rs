//! End-to-end scenarios from spec.md §8, exercised against the real
//! component wiring (a live Redis at `redis://127.0.0.1:6379` and a mock
//! HTTP origin via `wiremock`), bypassing only the raw TCP accept loop —
//! the request-framing codec is already covered by unit tests in
//! `core::http::request`.

use cacheproxy::core::cache::manager::CacheManager;
use cacheproxy::core::filter::RequestFilter;
use cacheproxy::core::http::request::Request;
use cacheproxy::core::pool::ConnectionPool;
use cacheproxy::core::rate_limiter::RateLimiter;
use cacheproxy::core::stats::Statistics;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn redis_client() -> redis::Client {
    redis::Client::open("redis://127.0.0.1:6379/0").expect("valid redis url")
}

fn get_request(target: &str) -> Request {
    Request {
        method: "GET".to_string(),
        target: target.to_string(),
        version: "HTTP/1.1".to_string(),
        headers: vec![("Host".to_string(), "p".to_string())],
        body: Vec::new(),
        client_ip: "127.0.0.1".to_string(),
    }
}

struct Harness {
    filter: Arc<RequestFilter>,
    cache: Arc<CacheManager>,
    pool: Arc<ConnectionPool>,
    stats: Arc<Statistics>,
}

impl Harness {
    async fn new(origin: &str, filters: Vec<String>) -> Self {
        let stats = Arc::new(Statistics::new());
        let client = redis_client();
        // Scenarios share a Redis db; invalidate everything first so one
        // test's leftover keys don't leak into the next.
        let cache = Arc::new(CacheManager::new(client.clone(), 300, Arc::clone(&stats)));
        cache.invalidate(None).await.ok();

        Self {
            filter: Arc::new(RequestFilter::new(filters)),
            cache,
            pool: Arc::new(
                ConnectionPool::new(vec![origin.to_string()], Duration::from_secs(5), true, 10)
                    .unwrap(),
            ),
            stats,
        }
    }

    fn handler(&self, compression_enabled: bool) -> cacheproxy::core::handler::RequestHandler {
        cacheproxy::core::handler::RequestHandler::new(
            Arc::clone(&self.filter),
            Arc::clone(&self.cache),
            Arc::clone(&self.pool),
            Arc::clone(&self.stats),
            compression_enabled,
        )
    }
}

#[tokio::test]
#[ignore = "requires a live Redis at 127.0.0.1:6379"]
async fn scenario_1_repeat_get_is_served_from_cache() {
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/x"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("hello")
                .insert_header("Content-Type", "text/plain"),
        )
        .expect(1)
        .mount(&origin)
        .await;

    let harness = Harness::new(&origin.uri(), vec![]).await;
    let handler = harness.handler(false);

    let first = handler.handle(get_request("/x")).await;
    assert_eq!(first.status_code, 200);
    assert_eq!(first.body, b"hello");
    assert_eq!(harness.stats.snapshot().cache_misses, 1);

    let second = handler.handle(get_request("/x")).await;
    assert_eq!(second.status_code, 200);
    assert_eq!(second.body, b"hello");
    assert_eq!(harness.stats.snapshot().cache_hits, 1);

    // `expect(1)` on the mock is verified on drop: the origin must have
    // seen exactly one request despite two client GETs.
}

#[tokio::test]
#[ignore = "requires a live Redis at 127.0.0.1:6379"]
async fn scenario_2_error_status_is_relayed_and_not_cached() {
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/e"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&origin)
        .await;

    let harness = Harness::new(&origin.uri(), vec![]).await;
    let handler = harness.handler(false);

    let first = handler.handle(get_request("/e")).await;
    assert_eq!(first.status_code, 500);
    assert_eq!(harness.stats.snapshot().requests_success, 1);

    let second = handler.handle(get_request("/e")).await;
    assert_eq!(second.status_code, 500);
    // Second GET hit the origin again since 500 responses are never cached.
}

#[tokio::test]
async fn scenario_3_denylisted_url_is_rejected_before_forwarding() {
    let origin = MockServer::start().await;
    // No mock registered for "/track/ads/pixel" - any request reaching the
    // origin would cause wiremock to return 404 and fail this test's intent
    // is checked structurally instead via request counts below.

    let harness = Harness::new(&origin.uri(), vec!["ads".to_string()]).await;
    let handler = harness.handler(false);

    let resp = handler.handle(get_request("/track/ads/pixel")).await;
    assert_eq!(resp.status_code, 403);
    assert_eq!(harness.stats.snapshot().requests_total, 1);
    assert_eq!(origin.received_requests().await.unwrap().len(), 0);
}

#[tokio::test]
#[ignore = "requires a live Redis at 127.0.0.1:6379"]
async fn scenario_5_large_text_response_is_gzip_compressed() {
    let body = "x".repeat(2000);
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/big"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body.clone())
                .insert_header("Content-Type", "text/html"),
        )
        .mount(&origin)
        .await;

    let harness = Harness::new(&origin.uri(), vec![]).await;
    let handler = harness.handler(true);

    let mut request = get_request("/big");
    request
        .headers
        .push(("Accept-Encoding".to_string(), "gzip".to_string()));

    let resp = handler.handle(request).await;
    assert_eq!(resp.status_code, 200);
    assert!(resp.body.len() < body.len());
    assert!(
        resp.headers
            .iter()
            .any(|(k, v)| k.eq_ignore_ascii_case("Content-Encoding") && v == "gzip")
    );

    let mut decoder = flate2::read::GzDecoder::new(&resp.body[..]);
    let mut decompressed = String::new();
    std::io::Read::read_to_string(&mut decoder, &mut decompressed).unwrap();
    assert_eq!(decompressed, body);
}

#[tokio::test]
async fn scenario_6_stats_endpoint_returns_parseable_json() {
    let origin = MockServer::start().await;
    let harness = Harness::new(&origin.uri(), vec![]).await;
    let handler = harness.handler(false);

    let resp = handler.handle(get_request("/proxy-stats")).await;
    assert_eq!(resp.status_code, 200);
    assert!(
        resp.headers
            .iter()
            .any(|(k, v)| k.eq_ignore_ascii_case("Content-Type") && v == "application/json")
    );

    let parsed: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
    assert!(parsed.get("requests_total").is_some());
    assert!(parsed.get("cache_hit_ratio").is_some());
    assert!(parsed.get("uptime_seconds").is_some());
}

#[tokio::test]
#[ignore = "requires a live Redis at 127.0.0.1:6379"]
async fn scenario_4_rate_limit_closes_connection_without_a_reply() {
    let client = redis_client();
    let limiter = RateLimiter::new(client, 2, 60);
    let ip = "203.0.113.7";

    assert!(!limiter.is_rate_limited(ip).await);
    assert!(!limiter.is_rate_limited(ip).await);
    assert!(limiter.is_rate_limited(ip).await);
}
