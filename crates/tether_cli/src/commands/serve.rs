//! Serve command implementation.

use super::Backends;
use crate::config::TetherConfig;
use std::future::Future;
use std::sync::Arc;
use tether_health::ProbeServer;
use tracing::{info, warn};

/// Runs the serve command.
///
/// Serves the probe endpoints right away, connects every configured
/// backend in the background, and on Ctrl-C disconnects. A backend that
/// is still retrying reports `disconnected` until it connects.
pub async fn run(config: &TetherConfig) -> Result<(), Box<dyn std::error::Error>> {
    let backends = Arc::new(Backends::from_config(config)?);
    let aggregator = Arc::new(backends.aggregator(config));
    let server = ProbeServer::bind(&config.probe, aggregator).await?;

    serve(server, backends, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        info!("shutdown requested");
    })
    .await
}

async fn serve<F>(
    server: ProbeServer,
    backends: Arc<Backends>,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let connecting = backends.spawn_connect();
    let result = server.run(shutdown).await;

    backends.shutdown(connecting).await;
    result?;
    Ok(())
}
