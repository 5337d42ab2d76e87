//! Main controller implementation.
//!
//! This module contains the `Controller` struct that orchestrates
//! reconciliation and resource watching for the FloatingIP controller.

use std::sync::Arc;

use kube::{Api, Client};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crds::FloatingIP;
use hcloud_client::{HcloudClient, HcloudClientTrait};

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::watcher::Watcher;

/// Main controller for FloatingIP management.
pub struct Controller {
    floating_ip_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance.
    pub async fn new(
        hcloud_endpoint: String,
        hcloud_token: String,
        resync_interval: chrono::Duration,
    ) -> Result<Self, ControllerError> {
        info!("Initializing FloatingIP controller");

        // Create Kubernetes client
        let kube_client = Client::try_default()
            .await
            .map_err(ControllerError::Kube)?;

        // Create Hetzner Cloud client
        let hcloud_client = HcloudClient::new(hcloud_endpoint.clone(), hcloud_token)
            .map_err(ControllerError::Hcloud)?;

        // Validate token and connectivity before proceeding
        info!("Validating Hetzner Cloud token and connectivity...");
        hcloud_client.validate_token().await.map_err(|e| {
            error!("Failed to validate Hetzner Cloud token: {}", e);
            error!("Please ensure:");
            error!("  1. HCLOUD_TOKEN environment variable is set correctly");
            error!("  2. The token is valid for the target project");
            error!("  3. The API is reachable at {}", hcloud_endpoint);
            ControllerError::Hcloud(e)
        })?;
        info!("Hetzner Cloud token validated and connectivity established");

        // FloatingIP is cluster-scoped
        let floating_ip_api: Api<FloatingIP> = Api::all(kube_client);

        // Create reconciler
        let reconciler = Reconciler::new(hcloud_client, floating_ip_api.clone(), resync_interval);

        // Adopt provider-side floating IPs that lost their status mapping
        // (e.g. controller crash between create and status write)
        info!("Performing startup reconciliation to adopt existing floating IPs...");
        if let Err(e) = reconciler.startup_reconciliation().await {
            warn!("Startup reconciliation failed (will continue): {}", e);
        } else {
            info!("Startup reconciliation completed");
        }

        let reconciler_arc = Arc::new(reconciler);
        let watcher_instance = Watcher::new(reconciler_arc, floating_ip_api);

        let floating_ip_watcher = tokio::spawn(async move {
            watcher_instance.watch_floating_ips().await
        });

        Ok(Self { floating_ip_watcher })
    }

    /// Runs the controller until shutdown.
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("FloatingIP controller running");

        // The watcher runs forever; returning at all is a failure
        self.floating_ip_watcher
            .await
            .map_err(|e| ControllerError::Watch(format!("FloatingIP watcher panicked: {e}")))?
            .map_err(|e| ControllerError::Watch(format!("FloatingIP watcher error: {e}")))?;

        Ok(())
    }
}
