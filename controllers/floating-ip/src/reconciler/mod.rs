//! Reconciliation logic for the FloatingIP CRD.
//!
//! The state machine itself lives in `floating_ip`; this module holds the
//! `Reconciler` plumbing: the cloud client handle, the Kubernetes API
//! handle, and per-resource backoff state.

pub mod floating_ip;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use kube::Api;
use tracing::{debug, error, info, warn};

use crds::{FloatingIP, FloatingIPPhase, FloatingIPStatus};
use hcloud_client::HcloudClientTrait;

use crate::backoff::{with_jitter, ExponentialBackoff};
use crate::conditions;
use crate::error::ControllerError;

/// Transient failures per resource before the controller gives up and
/// parks the resource in the `Failed` phase.
pub(crate) const MAX_ATTEMPTS: u32 = 5;

/// First retry delay for a failed reconcile.
const BACKOFF_BASE_SECS: u64 = 10;
/// Retry delay cap.
const BACKOFF_MAX_SECS: u64 = 600;

/// Backoff state for a resource
#[derive(Debug, Clone)]
struct BackoffState {
    backoff: ExponentialBackoff,
    error_count: u32,
}

impl BackoffState {
    fn new() -> Self {
        Self {
            backoff: ExponentialBackoff::new(BACKOFF_BASE_SECS, BACKOFF_MAX_SECS),
            error_count: 0,
        }
    }

    fn increment_error(&mut self) {
        self.error_count += 1;
    }

    fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Reconciles FloatingIP resources against Hetzner Cloud.
pub struct Reconciler {
    pub(crate) hcloud_client: Box<dyn HcloudClientTrait + Send + Sync>,
    pub(crate) floating_ip_api: Api<FloatingIP>,
    /// How often a Bound resource is re-verified against the provider
    pub(crate) resync_interval: chrono::Duration,
    /// Error count tracking per resource (name -> BackoffState)
    backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(
        hcloud_client: impl HcloudClientTrait + 'static,
        floating_ip_api: Api<FloatingIP>,
        resync_interval: chrono::Duration,
    ) -> Self {
        Self {
            hcloud_client: Box::new(hcloud_client),
            floating_ip_api,
            resync_interval,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Performs startup reconciliation to map existing Hetzner Cloud
    /// floating IPs back to Kubernetes resources.
    ///
    /// A FloatingIP without a recorded provider ID may still own a cloud
    /// resource: the controller might have crashed between the create call
    /// and the status write. Floating IPs are created with the resource
    /// name, so an exact unique name match is adopted here instead of
    /// allocating a second address.
    pub async fn startup_reconciliation(&self) -> Result<(), ControllerError> {
        info!("Starting startup reconciliation for FloatingIP resources...");

        let fips = match self.floating_ip_api.list(&Default::default()).await {
            Ok(list) => list,
            Err(e) => {
                error!("Failed to list FloatingIP resources: {}", e);
                return Err(ControllerError::Kube(e));
            }
        };

        info!("Found {} FloatingIP resources to reconcile", fips.items.len());

        let mut adopted_count = 0;
        let mut not_found_count = 0;

        for fip in fips.items {
            let name = fip.metadata.name.as_ref().ok_or_else(|| {
                ControllerError::InvalidConfig("FloatingIP missing name".to_string())
            })?;

            if fip.metadata.deletion_timestamp.is_some() {
                continue;
            }

            // Skip if already bound to a provider resource
            if let Some(status) = &fip.status {
                if status.provider_id.is_some() {
                    debug!("FloatingIP {} already has a provider ID, skipping", name);
                    continue;
                }
            }

            info!("Mapping FloatingIP {} to an existing Hetzner Cloud floating IP...", name);

            let existing = match self.hcloud_client.get_floating_ip_by_name(name).await {
                Ok(existing) => existing,
                Err(e) => {
                    warn!("Lookup for floating IP {} failed (will continue): {}", name, e);
                    continue;
                }
            };

            if let Some(existing) = existing {
                let now = chrono::Utc::now();
                let current = fip.status.clone().unwrap_or_default();
                let status = FloatingIPStatus {
                    provider_id: Some(existing.id),
                    ip: Some(existing.ip.clone()),
                    location: Some(existing.home_location.name.clone()),
                    phase: FloatingIPPhase::Bound,
                    conditions: conditions::merge_conditions(
                        &current.conditions,
                        vec![conditions::ready(
                            true,
                            conditions::REASON_ADOPTED,
                            format!("adopted existing floating IP {}", existing.ip),
                        )],
                        now,
                        fip.metadata.generation,
                    ),
                    observed_generation: fip.metadata.generation,
                    last_synced: Some(now),
                };

                match self.patch_status(name, &status).await {
                    Ok(()) => {
                        info!(
                            "Adopted floating IP {} (ID: {}) for FloatingIP {}",
                            existing.ip, existing.id, name
                        );
                        adopted_count += 1;
                    }
                    Err(e) => {
                        error!("Failed to update FloatingIP {} status: {}", name, e);
                    }
                }
            } else {
                debug!("No existing floating IP named {}, a fresh one will be created", name);
                not_found_count += 1;
            }
        }

        info!(
            "Startup reconciliation complete: {} adopted, {} pending creation",
            adopted_count, not_found_count
        );
        Ok(())
    }

    /// Patch the status subresource of a FloatingIP.
    pub(crate) async fn patch_status(
        &self,
        name: &str,
        status: &FloatingIPStatus,
    ) -> Result<(), ControllerError> {
        let patch = serde_json::json!({ "status": status });
        let pp = kube::api::PatchParams::default();
        self.floating_ip_api
            .patch_status(name, &pp, &kube::api::Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    /// Get the backoff duration for a resource based on its error count.
    ///
    /// Advances the resource's backoff sequence and spreads the result with
    /// per-resource jitter. Returns (backoff_seconds, error_count).
    pub fn get_backoff_for_resource(&self, resource_key: &str) -> (u64, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states
                    .entry(resource_key.to_string())
                    .or_insert_with(BackoffState::new);
                let backoff_seconds = with_jitter(
                    state.backoff.next_backoff_seconds(),
                    resource_key,
                    state.error_count,
                );
                (backoff_seconds, state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using default backoff", e);
                (60, 0)
            }
        }
    }

    /// Increment the error count for a resource; returns the new count.
    pub fn increment_error(&self, resource_key: &str) -> u32 {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states
                    .entry(resource_key.to_string())
                    .or_insert_with(BackoffState::new);
                state.increment_error();
                state.error_count
            }
            Err(_) => 1,
        }
    }

    /// Reset the error count for a resource (on successful reconciliation).
    pub fn reset_error(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            if let Some(state) = states.get_mut(resource_key) {
                state.reset();
            }
        }
    }
}
