//! FloatingIP Controller
//!
//! Reconciles cluster-scoped `FloatingIP` CRDs against Hetzner Cloud:
//! allocates floating IPs, keeps their mutable fields in sync, detects
//! drift, and tears the allocation down behind a finalizer when the
//! resource is deleted.

mod backoff;
mod conditions;
mod controller;
mod error;
mod reconciler;
#[cfg(test)]
mod test_utils;
mod watcher;

use std::env;

use tracing::info;

use crate::controller::Controller;
use crate::error::ControllerError;

/// Default interval for re-verifying Bound resources against the provider.
const DEFAULT_RESYNC_SECONDS: i64 = 300;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt::init();

    info!("Starting FloatingIP Controller");

    // Load configuration from environment variables
    let hcloud_endpoint = env::var("HCLOUD_ENDPOINT")
        .unwrap_or_else(|_| "https://api.hetzner.cloud/v1".to_string());
    let hcloud_token = env::var("HCLOUD_TOKEN").map_err(|_| {
        ControllerError::InvalidConfig(
            "HCLOUD_TOKEN environment variable is required".to_string(),
        )
    })?;
    let resync_seconds = match env::var("RESYNC_INTERVAL_SECONDS") {
        Ok(raw) => raw.parse::<i64>().map_err(|_| {
            ControllerError::InvalidConfig(format!(
                "RESYNC_INTERVAL_SECONDS must be a number of seconds, got {raw:?}"
            ))
        })?,
        Err(_) => DEFAULT_RESYNC_SECONDS,
    };

    info!("Configuration:");
    info!("  Hetzner Cloud endpoint: {}", hcloud_endpoint);
    info!("  Resync interval: {}s", resync_seconds);

    // Initialize and run controller
    let controller = Controller::new(
        hcloud_endpoint,
        hcloud_token,
        chrono::Duration::seconds(resync_seconds),
    )
    .await?;
    controller.run().await?;

    Ok(())
}
