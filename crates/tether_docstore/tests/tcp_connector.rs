//! Integration tests for the document-store connector over TCP.

use std::sync::Arc;
use std::time::Duration;
use tether_core::{
    ConnectionRegistry, ConnectionStatus, Connector, DocumentStoreConfig, HealthStatus,
};
use tether_docstore::{DocumentStoreConnector, TcpDocumentDriver};
use tokio::net::TcpListener;

async fn wait_for(connector: &impl Connector, status: ConnectionStatus) -> HealthStatus {
    let mut last = connector.health_check().await;
    for _ in 0..200 {
        if last.status() == status {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
        last = connector.health_check().await;
    }
    last
}

#[tokio::test]
async fn connects_to_listening_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _conn = listener.accept().await;
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let registry = Arc::new(ConnectionRegistry::new());
    let connector = DocumentStoreConnector::new(
        DocumentStoreConfig::new(format!("mongodb://{addr}/app")),
        TcpDocumentDriver::new(Duration::from_secs(1)),
        Arc::clone(&registry),
    );

    let handle = connector.connect().await.unwrap();
    assert_eq!(handle.name(), "mongodb");

    let health = wait_for(&connector, ConnectionStatus::Connected).await;
    assert_eq!(health, HealthStatus::connected());

    connector.disconnect().await.unwrap();
    assert_eq!(handle.health_check().await, HealthStatus::disconnected());
    assert!(registry.get("mongodb").is_err());
}

#[tokio::test]
async fn unreachable_server_degrades_without_failing_connect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let registry = Arc::new(ConnectionRegistry::new());
    let connector = DocumentStoreConnector::new(
        DocumentStoreConfig::new(format!("mongodb://{addr}")),
        TcpDocumentDriver::new(Duration::from_secs(1)),
        registry,
    );

    // The handshake is fire-and-forget; failure shows up in health.
    connector.connect().await.unwrap();
    let health = wait_for(&connector, ConnectionStatus::Disconnected).await;
    assert_eq!(health.status(), ConnectionStatus::Disconnected);
    assert!(!health.is_connected());

    connector.disconnect().await.unwrap();
}

#[tokio::test]
async fn srv_uri_fails_fast() {
    let connector = DocumentStoreConnector::new(
        DocumentStoreConfig::new("mongodb+srv://cluster.example.com/app"),
        TcpDocumentDriver::new(Duration::from_secs(1)),
        Arc::new(ConnectionRegistry::new()),
    );

    assert!(connector.connect().await.is_err());
    assert_eq!(connector.health_check().await, HealthStatus::disconnected());
}
