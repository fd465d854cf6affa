//! HTTP probe endpoints.
//!
//! - `GET /livez` - 200 while the process can answer
//! - `GET /readyz` - 200 when every required backend is connected, 503 otherwise
//! - `GET /health` - the full [`HealthReport`], always 200

use crate::aggregator::{HealthAggregator, HealthReport};
use crate::config::ProbeConfig;
use crate::error::{ProbeServerError, ProbeServerResult};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};
use tracing::info;

/// Builds the probe router.
pub fn create_router(aggregator: Arc<HealthAggregator>) -> Router {
    Router::new()
        .route("/livez", get(livez_handler))
        .route("/readyz", get(readyz_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(aggregator)
}

async fn livez_handler() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}

async fn readyz_handler(State(aggregator): State<Arc<HealthAggregator>>) -> Response {
    let report = aggregator.poll().await;
    let code = if report.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(report)).into_response()
}

async fn health_handler(State(aggregator): State<Arc<HealthAggregator>>) -> Json<HealthReport> {
    Json(aggregator.poll().await)
}

/// A bound probe server.
pub struct ProbeServer {
    listener: TcpListener,
    router: Router,
}

impl ProbeServer {
    /// Binds the listen socket.
    ///
    /// The aggregator's check timeout is not changed here; build it with
    /// [`HealthAggregator::with_check_timeout`] from the same config.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the address is taken.
    pub async fn bind(
        config: &ProbeConfig,
        aggregator: Arc<HealthAggregator>,
    ) -> ProbeServerResult<Self> {
        config.validate()?;
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|source| ProbeServerError::Bind {
                addr: config.bind_addr,
                source,
            })?;

        Ok(Self {
            listener,
            router: create_router(aggregator),
        })
    }

    /// Returns the bound address.
    pub fn local_addr(&self) -> ProbeServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves probes until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> ProbeServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.local_addr()?;
        info!(%addr, "probe server listening");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!(%addr, "probe server stopped");
        Ok(())
    }
}
