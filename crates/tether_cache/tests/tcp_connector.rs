//! Cache connector over the reconnecting TCP client.

use std::sync::Arc;
use std::time::Duration;
use tether_cache::{CacheStoreConnector, ReconnectingClient, TcpDialer};
use tether_core::{
    CacheStoreConfig, ConnectionRegistry, ConnectionStatus, Connector, ConnectorError,
    HealthStatus,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serves a single client, answering every read with `+PONG`.
///
/// Aborting the returned task drops both the listener and the socket.
async fn pong_server() -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let task = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 64];
        loop {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(_) => {
                    if socket.write_all(b"+PONG\r\n").await.is_err() {
                        return;
                    }
                }
            }
        }
    });
    (addr, task)
}

async fn unused_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().to_string()
}

fn connector(
    addr: &str,
    max_retries: u32,
) -> CacheStoreConnector<ReconnectingClient<TcpDialer>> {
    let config = CacheStoreConfig::new(format!("redis://{addr}"))
        .with_max_retries(max_retries)
        .with_retry_interval(Duration::from_millis(10))
        .with_probe_timeout(Duration::from_millis(200));
    let dialer = TcpDialer::from_url(&config.url)
        .unwrap()
        .with_connect_timeout(Duration::from_millis(200))
        .with_keepalive(Duration::from_millis(20));

    CacheStoreConnector::new(
        config,
        ReconnectingClient::new(dialer),
        Arc::new(ConnectionRegistry::new()),
    )
}

#[tokio::test]
async fn connects_and_pings() {
    let (addr, server) = pong_server().await;
    let connector = connector(&addr, 3);

    let handle = connector.connect().await.unwrap();
    assert_eq!(handle.health_check().await, HealthStatus::connected());

    connector.disconnect().await.unwrap();
    assert_eq!(connector.health_check().await, HealthStatus::disconnected());
    server.abort();
}

#[tokio::test]
async fn unreachable_server_exhausts_retries() {
    let addr = unused_addr().await;
    let connector = connector(&addr, 2);

    let err = connector.connect().await.unwrap_err();
    assert!(matches!(err, ConnectorError::RetryExhausted { attempts: 3, .. }));

    let snapshot = connector.snapshot();
    assert_eq!(snapshot.status, ConnectionStatus::Disconnected);
    assert_eq!(snapshot.reconnection.attempt, 3);
    assert_eq!(connector.health_check().await, HealthStatus::disconnected());
}

#[tokio::test]
async fn lost_server_degrades_health_without_panicking() {
    let (addr, server) = pong_server().await;
    let connector = connector(&addr, 2);
    let handle = connector.connect().await.unwrap();

    server.abort();

    let mut status = ConnectionStatus::Connected;
    for _ in 0..200 {
        status = connector.snapshot().status;
        if status == ConnectionStatus::Disconnected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(status, ConnectionStatus::Disconnected);
    assert_eq!(handle.health_check().await, HealthStatus::disconnected());
    connector.disconnect().await.unwrap();
}

#[tokio::test]
async fn disconnect_stops_a_retrying_connect() {
    let addr = unused_addr().await;
    let connector = Arc::new(connector(&addr, 1_000));

    let connecting = tokio::spawn({
        let connector = Arc::clone(&connector);
        async move { connector.connect().await }
    });
    for _ in 0..200 {
        if connector.reconnection().attempt > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    tokio::time::timeout(Duration::from_secs(2), connector.disconnect())
        .await
        .unwrap()
        .unwrap();
    let result = tokio::time::timeout(Duration::from_secs(2), connecting)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(result, Err(ConnectorError::Closed)));
    assert_eq!(connector.snapshot().status, ConnectionStatus::Disconnected);
}
