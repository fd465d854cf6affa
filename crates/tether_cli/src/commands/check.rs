//! Check command implementation.

use super::Backends;
use crate::config::TetherConfig;
use std::sync::Arc;
use std::time::Duration;
use tether_health::{HealthAggregator, HealthReport};
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runs the check command.
///
/// Connects every configured backend in the background, polls until ready
/// or until `wait` elapses, prints the report and disconnects. Connects
/// still retrying at the deadline are cancelled. Fails when not ready.
pub async fn run(
    config: &TetherConfig,
    wait: Duration,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let backends = Arc::new(Backends::from_config(config)?);
    let connecting = backends.spawn_connect();

    let aggregator = backends.aggregator(config);
    let report = poll_until_ready(&aggregator, wait).await;
    backends.shutdown(connecting).await;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            print_text_output(&report);
        }
    }

    if report.ready {
        Ok(())
    } else {
        Err("not ready".into())
    }
}

/// Polls until the report is ready or `wait` elapsed; returns the last report.
async fn poll_until_ready(aggregator: &HealthAggregator, wait: Duration) -> HealthReport {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        let report = aggregator.poll().await;
        if report.ready || tokio::time::Instant::now() >= deadline {
            return report;
        }
        debug!("backends not ready yet");
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

fn print_text_output(report: &HealthReport) {
    println!("Ready: {}", if report.ready { "yes" } else { "no" });

    let width = report
        .backends
        .iter()
        .map(|b| b.name.len())
        .max()
        .unwrap_or(0);
    for backend in &report.backends {
        println!(
            "  {:<width$}  {:<12}  {}",
            backend.name,
            backend.status.as_str(),
            if backend.required { "required" } else { "optional" },
        );
    }
}
