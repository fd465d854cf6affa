//! Probe routes over real adapters with mock drivers.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tether_cache::{CacheStoreConnector, MockCacheClient};
use tether_core::{
    CacheStoreConfig, ConnectionRegistry, Connector, ConnectorError, DocumentStoreConfig,
};
use tether_docstore::{DocumentStoreConnector, MockDocumentDriver, READY_STATE_CONNECTING};
use tether_health::{create_router, HealthAggregator, ProbeConfig, ProbeServer};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tower::ServiceExt;

struct Fixture {
    registry: Arc<ConnectionRegistry>,
    docs: DocumentStoreConnector<MockDocumentDriver>,
    driver: Arc<MockDocumentDriver>,
    cache: CacheStoreConnector<MockCacheClient>,
    client: Arc<MockCacheClient>,
    aggregator: Arc<HealthAggregator>,
}

fn fixture() -> Fixture {
    let registry = Arc::new(ConnectionRegistry::new());
    let driver = Arc::new(MockDocumentDriver::new());
    let client = Arc::new(MockCacheClient::new());

    let docs = DocumentStoreConnector::with_shared_driver(
        DocumentStoreConfig::new("mongodb://mock:27017/app"),
        Arc::clone(&driver),
        Arc::clone(&registry),
    );
    let cache = CacheStoreConnector::with_shared_client(
        CacheStoreConfig::new("redis://mock:6379"),
        Arc::clone(&client),
        Arc::clone(&registry),
    );
    let aggregator = Arc::new(
        HealthAggregator::new(Arc::clone(&registry))
            .with_backend(docs.name())
            .with_backend(cache.name())
            .with_check_timeout(Duration::from_millis(200)),
    );

    Fixture {
        registry,
        docs,
        driver,
        cache,
        client,
        aggregator,
    }
}

async fn get(aggregator: &Arc<HealthAggregator>, uri: &str) -> (StatusCode, Value) {
    let response = create_router(Arc::clone(aggregator))
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn livez_is_always_ok() {
    let f = fixture();
    let (status, body) = get(&f.aggregator, "/livez").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn readyz_before_connect_is_unavailable() {
    let f = fixture();
    let (status, body) = get(&f.aggregator, "/readyz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ready"], false);
    assert_eq!(body["backends"][0]["status"], "disconnected");
    assert_eq!(body["backends"][1]["status"], "disconnected");
}

#[tokio::test]
async fn readyz_after_connect_is_ok() {
    let f = fixture();
    f.docs.connect().await.unwrap();
    f.cache.connect().await.unwrap();
    assert_eq!(f.registry.names(), vec!["mongodb", "redis"]);

    let (status, body) = get(&f.aggregator, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
    assert_eq!(body["backends"][0]["connected"], true);
    assert_eq!(body["backends"][1]["connected"], true);
}

#[tokio::test]
async fn one_unhealthy_backend_flips_readiness() {
    let f = fixture();
    f.docs.connect().await.unwrap();
    f.cache.connect().await.unwrap();

    f.client
        .set_ping_error(Some(ConnectorError::transport_retryable("broken pipe")));
    let (status, body) = get(&f.aggregator, "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["backends"][0]["connected"], true);
    assert_eq!(body["backends"][1]["status"], "disconnected");

    f.client.set_ping_error(None);
    f.driver.set_ready_state(READY_STATE_CONNECTING);
    let (status, body) = get(&f.aggregator, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], false);
    assert_eq!(body["backends"][0]["status"], "connecting");
}

#[tokio::test]
async fn readyz_after_disconnect_is_unavailable() {
    let f = fixture();
    f.docs.connect().await.unwrap();
    f.cache.connect().await.unwrap();
    f.docs.disconnect().await.unwrap();
    f.cache.disconnect().await.unwrap();

    let (status, _) = get(&f.aggregator, "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn hung_probe_does_not_hang_readyz() {
    let f = fixture();
    f.docs.connect().await.unwrap();
    f.cache.connect().await.unwrap();
    f.client.set_ping_delay(Duration::from_secs(30));

    let started = tokio::time::Instant::now();
    let (status, _) = get(&f.aggregator, "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn server_serves_until_shutdown() {
    let f = fixture();
    let config = ProbeConfig::default().with_bind_addr("127.0.0.1:0".parse().unwrap());
    let server = ProbeServer::bind(&config, Arc::clone(&f.aggregator))
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();

    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let running = tokio::spawn(server.run(async {
        let _ = stopped.await;
    }));

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /livez HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"));

    stop.send(()).unwrap();
    running.await.unwrap().unwrap();
}
