//! End-to-end tests against a running server

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::{Method, Request, StatusCode};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use latlab::config::{Config, SimulationConfig};
use latlab::latency::JITTER_BOUND_MS;
use latlab::network::NetworkHandler;

struct TestServer {
    addr: SocketAddr,
    shutdown: broadcast::Sender<()>,
    handle: JoinHandle<latlab::Result<()>>,
}

impl TestServer {
    async fn start(simulation: SimulationConfig) -> Self {
        let mut config = Config::default();
        config.simulation = simulation;
        config.limits.shutdown_timeout_ms = 1000;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handler = NetworkHandler::new(config);
        let shutdown = handler.shutdown_handle();
        let handle = tokio::spawn(handler.serve(listener));

        Self {
            addr,
            shutdown,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn stop(self) {
        self.shutdown.send(()).ok();
        tokio::time::timeout(Duration::from_secs(3), self.handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}

fn client() -> Client<HttpConnector, Empty<Bytes>> {
    Client::builder(TokioExecutor::new()).build_http()
}

fn h2c_client() -> Client<HttpConnector, Empty<Bytes>> {
    Client::builder(TokioExecutor::new())
        .http2_only(true)
        .build_http()
}

async fn send(
    client: &Client<HttpConnector, Empty<Bytes>>,
    method: Method,
    url: &str,
) -> (StatusCode, hyper::HeaderMap, Bytes) {
    let request = Request::builder()
        .method(method)
        .uri(url)
        .body(Empty::new())
        .unwrap();

    let response = client.request(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body)
}

async fn get(url: &str) -> (StatusCode, hyper::HeaderMap, Bytes) {
    send(&client(), Method::GET, url).await
}

async fn get_json(url: &str) -> serde_json::Value {
    let (status, headers, body) = get(url).await;
    assert_eq!(status, StatusCode::OK, "GET {url}");
    assert_eq!(headers[hyper::header::CONTENT_TYPE], "application/json");
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_and_protocol() {
    let server = TestServer::start(SimulationConfig::default()).await;

    let health = get_json(&server.url("/api/health?foo=bar")).await;
    assert_eq!(health, serde_json::json!({ "status": "ok" }));

    let health = get_json(&server.url("/api/health?x=%FF")).await;
    assert_eq!(health, serde_json::json!({ "status": "ok" }));

    let protocol = get_json(&server.url("/api/protocol")).await;
    assert_eq!(protocol["protocol"], "HTTP/1.1");

    let (_, _, body) = send(&h2c_client(), Method::GET, &server.url("/api/protocol")).await;
    let protocol: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(protocol["protocol"], "HTTP/2.0");

    server.stop().await;
}

#[tokio::test]
async fn test_text_resources() {
    let server = TestServer::start(SimulationConfig::default()).await;

    let (status, headers, css) = get(&server.url("/api/resource/css?id=3")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[hyper::header::CONTENT_TYPE], "text/css");
    assert_eq!(headers[hyper::header::CACHE_CONTROL], "no-store");
    assert!(css.len() >= 2 * 1024);
    assert!(css.starts_with("/* fake css file id=3 size\u{2248}2KB */\n".as_bytes()));

    let (status, headers, js) = get(&server.url("/api/resource/js?size=-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[hyper::header::CONTENT_TYPE], "application/javascript");
    assert!(js.len() >= 4 * 1024);
    assert!(js.starts_with("// fake js file size\u{2248}4KB\n".as_bytes()));

    server.stop().await;
}

#[tokio::test]
async fn test_image_is_deterministic() {
    let server = TestServer::start(SimulationConfig::default()).await;

    let (status, headers, first) = get(&server.url("/api/resource/image?size=3")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[hyper::header::CONTENT_TYPE], "application/octet-stream");
    assert_eq!(first.len(), 3 * 1024);
    assert!(first.iter().enumerate().all(|(i, &b)| usize::from(b) == i % 256));

    let (_, _, second) = get(&server.url("/api/resource/image?size=3&id=99")).await;
    assert_eq!(first, second);

    let (_, _, default) = get(&server.url("/api/resource/image?size=0")).await;
    assert_eq!(default.len(), 16 * 1024);

    server.stop().await;
}

#[tokio::test]
async fn test_fast_api_latency() {
    let server = TestServer::start(SimulationConfig::default()).await;

    let started = Instant::now();
    let url = server.url("/api/resource/api/fast?protocol=HTTP3&condition=5g&id=8");
    let body = get_json(&url).await;
    let elapsed = started.elapsed();

    assert_eq!(body["type"], "fast");
    assert_eq!(body["protocol"], "http3");
    assert_eq!(body["condition"], "5g");
    assert_eq!(body["id"], 8);
    assert_eq!(body["configuredDelayMs"], 18);
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));

    let measured = body["measuredLatencyMs"].as_u64().unwrap();
    assert!((18..18 + JITTER_BOUND_MS).contains(&measured));
    assert!(elapsed >= Duration::from_millis(measured));

    let body = get_json(&server.url("/api/resource/api/fast?protocol=spdy&condition=lte")).await;
    assert_eq!(body["protocol"], "http2");
    assert_eq!(body["condition"], "wifi");
    assert_eq!(body["configuredDelayMs"], 60);
    assert!(body["id"].is_null());

    server.stop().await;
}

#[tokio::test]
async fn test_concurrent_fast_calls_share_configured_delay() {
    let server = TestServer::start(SimulationConfig::default()).await;
    let url = server.url("/api/resource/api/fast?protocol=http2&condition=slow3g");

    let bodies = join_all((0..16).map(|_| get_json(&url))).await;

    for body in &bodies {
        assert_eq!(body["configuredDelayMs"], 180);
        let jitter = body["measuredLatencyMs"].as_u64().unwrap() - 180;
        assert!(jitter < JITTER_BOUND_MS);
    }

    server.stop().await;
}

#[tokio::test]
async fn test_slow_api_does_not_block_others() {
    let server = TestServer::start(SimulationConfig::default()).await;

    let started = Instant::now();
    let slow_url = server.url("/api/resource/api/slow?id=1");
    let slow = tokio::spawn(async move { get_json(&slow_url).await });

    let legacy = get_json(&server.url("/api/resource/api/fast/legacy?id=2")).await;
    assert!(started.elapsed() < Duration::from_millis(1500));
    assert_eq!(legacy["type"], "fast");
    assert_eq!(legacy["id"], 2);

    let slow = slow.await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(2000));
    assert_eq!(slow["type"], "slow");
    assert_eq!(slow["id"], 1);
    assert_eq!(slow.as_object().unwrap().len(), 3);

    server.stop().await;
}

#[tokio::test]
async fn test_client_errors() {
    let server = TestServer::start(SimulationConfig::default()).await;

    let (status, _, _) = get(&server.url("/api/resource/css?size=two")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = get(&server.url("/api/resource/api/slow?id=1.5")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = get(&server.url("/api/resource/video")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(&client(), Method::POST, &server.url("/api/health")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    server.stop().await;
}

#[tokio::test]
async fn test_strict_enums() {
    let server = TestServer::start(SimulationConfig {
        strict_enums: true,
        jitter: false,
    })
    .await;

    let (status, _, _) = get(&server.url("/api/resource/api/fast?protocol=quic")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let body = get_json(&server.url("/api/resource/api/fast?protocol=http3")).await;
    assert_eq!(body["measuredLatencyMs"], 25);

    let (status, headers, _) = get(&server.url("/api/resource/css?protocol=quic")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[hyper::header::CONTENT_TYPE], "text/css");

    let legacy = get_json(&server.url("/api/resource/api/fast/legacy?condition=lte&id=3")).await;
    assert_eq!(legacy["id"], 3);

    server.stop().await;
}

#[tokio::test]
async fn test_shutdown_interrupts_slow_request() {
    let server = TestServer::start(SimulationConfig::default()).await;

    let slow_url = server.url("/api/resource/api/slow");
    let slow = tokio::spawn(async move { get(&slow_url).await });

    tokio::time::sleep(Duration::from_millis(200)).await;
    let started = Instant::now();
    server.stop().await;

    let (status, _, body) = slow.await.unwrap();
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(String::from_utf8_lossy(&body).contains("interrupted"));
    assert!(started.elapsed() < Duration::from_millis(1500));
}
