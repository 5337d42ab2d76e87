//! FloatingIP reconciler
//!
//! Drives a FloatingIP resource through its lifecycle:
//! create (finalizer first, then allocation), mutable-field sync, drift
//! detection against the live provider record, and finalizer-gated
//! deletion. Provider calls happen in `next_status`/`finalize`, which are
//! free functions over the client trait so the state machine can be unit
//! tested without a cluster.

use chrono::{DateTime, Utc};
use kube::api::{Patch, PatchParams};
use kube::ResourceExt;
use kube_runtime::controller::Action;
use tracing::{debug, error, info, warn};

use crds::{
    FloatingIP, FloatingIPPhase, FloatingIPStatus, ProtocolVersion, FLOATING_IP_FINALIZER,
};
use hcloud_client::{
    CreateFloatingIpRequest, FloatingIpType, HcloudClientTrait, UpdateFloatingIpRequest,
};

use super::{Reconciler, MAX_ATTEMPTS};
use crate::conditions::{
    degraded, degraded_cleared, merge_conditions, progressing, progressing_done, ready,
    REASON_CLEANUP_FAILED, REASON_DELETING, REASON_IMMUTABLE_FIELD_CHANGED, REASON_IN_SYNC,
    REASON_INVALID_SPEC, REASON_PROVIDER_RESOURCE_MISSING, REASON_PROVISIONED,
    REASON_PROVISIONING, REASON_RECOVERED, REASON_RETRIES_EXHAUSTED, REASON_UPDATING,
};
use crate::error::ControllerError;

/// Requeue interval used when the configured resync interval cannot be
/// represented as a std Duration.
const FALLBACK_RESYNC: std::time::Duration = std::time::Duration::from_secs(300);

impl Reconciler {
    pub async fn reconcile_floating_ip(&self, fip: &FloatingIP) -> Result<Action, ControllerError> {
        let name = fip.metadata.name.as_ref().ok_or_else(|| {
            ControllerError::InvalidConfig("FloatingIP missing name".to_string())
        })?;

        info!("Reconciling FloatingIP {}", name);

        if fip.metadata.deletion_timestamp.is_some() {
            return self.finalize_floating_ip(fip, name).await;
        }

        // The finalizer must be durably persisted before the first provider
        // call: a crash mid-create must leave a recorded cleanup intent.
        if !fip.has_finalizer() {
            self.add_finalizer(name, fip).await?;
            return Ok(Action::requeue(std::time::Duration::from_secs(1)));
        }

        match next_status(self.hcloud_client.as_ref(), fip, Utc::now(), self.resync_interval).await
        {
            Ok(Some(status)) => {
                let terminal = status.phase == FloatingIPPhase::Failed;
                self.patch_status(name, &status).await?;
                self.reset_error(name);
                if terminal {
                    // Failed is held until the resource is touched again.
                    Ok(Action::await_change())
                } else {
                    Ok(Action::requeue(self.resync_requeue()))
                }
            }
            Ok(None) => {
                debug!("FloatingIP {} in sync, nothing to do", name);
                self.reset_error(name);
                let held = fip
                    .status
                    .as_ref()
                    .is_some_and(|s| s.phase == FloatingIPPhase::Failed);
                if held {
                    Ok(Action::await_change())
                } else {
                    Ok(Action::requeue(self.resync_requeue()))
                }
            }
            Err(e) if e.is_transient() => {
                let attempts = self.increment_error(name);
                if attempts >= MAX_ATTEMPTS {
                    warn!(
                        "FloatingIP {} failed {} consecutive times, giving up until the resource is touched: {}",
                        name, attempts, e
                    );
                    let status = retries_exhausted_status(fip, Utc::now(), &e);
                    self.patch_status(name, &status).await?;
                    self.reset_error(name);
                    return Ok(Action::await_change());
                }

                // Surface the in-flight phase while the retry budget lasts.
                let progress = in_flight_status(fip, Utc::now());
                if fip.status.as_ref() != Some(&progress) {
                    if let Err(patch_err) = self.patch_status(name, &progress).await {
                        warn!(
                            "Failed to update FloatingIP {} progress status: {}",
                            name, patch_err
                        );
                    }
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Deletion path: provider-side cleanup, then finalizer removal.
    async fn finalize_floating_ip(
        &self,
        fip: &FloatingIP,
        name: &str,
    ) -> Result<Action, ControllerError> {
        if !fip.has_finalizer() {
            debug!("FloatingIP {} has no finalizer, nothing to clean up", name);
            return Ok(Action::await_change());
        }

        info!("Finalizing FloatingIP {}", name);

        match finalize(self.hcloud_client.as_ref(), fip).await {
            Ok(()) => {
                self.remove_finalizer(name, fip).await?;
                self.reset_error(name);
                info!("FloatingIP {} cleanup complete, finalizer removed", name);
                Ok(Action::await_change())
            }
            Err(e) if e.is_transient() => {
                let attempts = self.increment_error(name);
                if attempts >= MAX_ATTEMPTS {
                    warn!(
                        "FloatingIP {} cleanup failed {} consecutive times, holding: {}",
                        name, attempts, e
                    );
                    let status = retries_exhausted_status(fip, Utc::now(), &e);
                    self.patch_status(name, &status).await?;
                    self.reset_error(name);
                    return Ok(Action::await_change());
                }

                let progress = in_flight_status(fip, Utc::now());
                if fip.status.as_ref() != Some(&progress) {
                    if let Err(patch_err) = self.patch_status(name, &progress).await {
                        warn!(
                            "Failed to update FloatingIP {} progress status: {}",
                            name, patch_err
                        );
                    }
                }
                Err(e)
            }
            Err(e) => {
                // Cleanup rejected by the provider; the finalizer stays in
                // place and an operator has to step in.
                error!("FloatingIP {} cleanup failed permanently: {}", name, e);
                let status = cleanup_failed_status(fip, Utc::now(), &e);
                if let Err(patch_err) = self.patch_status(name, &status).await {
                    warn!(
                        "Failed to update FloatingIP {} cleanup status: {}",
                        name, patch_err
                    );
                }
                Ok(Action::await_change())
            }
        }
    }

    async fn add_finalizer(&self, name: &str, fip: &FloatingIP) -> Result<(), ControllerError> {
        let mut finalizers = fip.metadata.finalizers.clone().unwrap_or_default();
        finalizers.push(FLOATING_IP_FINALIZER.to_string());
        let patch = serde_json::json!({ "metadata": { "finalizers": finalizers } });
        self.floating_ip_api
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        info!("Added finalizer to FloatingIP {}", name);
        Ok(())
    }

    async fn remove_finalizer(&self, name: &str, fip: &FloatingIP) -> Result<(), ControllerError> {
        let finalizers: Vec<String> = fip
            .metadata
            .finalizers
            .clone()
            .unwrap_or_default()
            .into_iter()
            .filter(|f| f != FLOATING_IP_FINALIZER)
            .collect();
        let patch = serde_json::json!({ "metadata": { "finalizers": finalizers } });
        self.floating_ip_api
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    fn resync_requeue(&self) -> std::time::Duration {
        self.resync_interval.to_std().unwrap_or(FALLBACK_RESYNC)
    }
}

/// Decide and execute the next provider-facing step for a live (not
/// deleting) FloatingIP.
///
/// Returns the status to persist, `Ok(None)` when the resource is already
/// converged, or a transient error for the caller's backoff handling.
pub(crate) async fn next_status(
    client: &dyn HcloudClientTrait,
    fip: &FloatingIP,
    now: DateTime<Utc>,
    resync_interval: chrono::Duration,
) -> Result<Option<FloatingIPStatus>, ControllerError> {
    let current = fip.status.clone().unwrap_or_default();
    let generation = fip.metadata.generation;

    // Failed is terminal: only an external touch (generation bump) revives
    // the resource.
    if current.phase == FloatingIPPhase::Failed && current.observed_generation == generation {
        return Ok(None);
    }

    // Create path. Guarded on the recorded provider ID so a reconcile
    // replay after a successful create can never allocate twice.
    let Some(provider_id) = current.provider_id else {
        if fip.spec.location.trim().is_empty() {
            let status = rejected_status(
                fip,
                &current,
                now,
                REASON_INVALID_SPEC,
                "spec.location must not be empty".to_string(),
                FloatingIPPhase::Failed,
            );
            return Ok(changed(&current, status));
        }
        let status = provision(client, fip, &current, now).await?;
        return Ok(changed(&current, status));
    };

    // Immutable fields are enforced against the recorded allocation; a spec
    // that cannot be applied costs no provider call.
    if let Some(field) = immutable_violation(fip, &current) {
        let status = rejected_status(
            fip,
            &current,
            now,
            REASON_IMMUTABLE_FIELD_CHANGED,
            format!("spec.{field} is immutable after creation; revert the change"),
            current.phase,
        );
        return Ok(changed(&current, status));
    }

    let spec_changed = current.observed_generation != generation;
    let resync_due = current
        .last_synced
        .is_none_or(|t| now - t >= resync_interval);
    if !spec_changed && !resync_due {
        return Ok(None);
    }

    let status = sync(client, fip, provider_id, &current, now).await?;
    Ok(changed(&current, status))
}

/// Provider-side cleanup for a FloatingIP marked for deletion.
///
/// A missing provider-side record counts as success: deletion is
/// idempotent.
pub(crate) async fn finalize(
    client: &dyn HcloudClientTrait,
    fip: &FloatingIP,
) -> Result<(), ControllerError> {
    let Some(provider_id) = fip.status.as_ref().and_then(|s| s.provider_id) else {
        debug!("FloatingIP {} owns no provider resource", fip.name_any());
        return Ok(());
    };

    match client.delete_floating_ip(provider_id).await {
        Ok(()) => {
            info!("Deleted floating IP {} for FloatingIP {}", provider_id, fip.name_any());
            Ok(())
        }
        Err(e) if e.is_not_found() => {
            debug!(
                "Floating IP {} already absent, treating deletion as complete",
                provider_id
            );
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Allocate the floating IP and project the resulting status.
async fn provision(
    client: &dyn HcloudClientTrait,
    fip: &FloatingIP,
    current: &FloatingIPStatus,
    now: DateTime<Utc>,
) -> Result<FloatingIPStatus, ControllerError> {
    let name = fip.name_any();
    let request = CreateFloatingIpRequest {
        name: Some(name.clone()),
        ip_type: ip_type_for(fip.spec.protocol_version),
        home_location: fip.spec.location.clone(),
        description: fip.spec.description.clone(),
        labels: (!fip.spec.labels.is_empty()).then(|| fip.spec.labels.clone()),
    };

    match client.create_floating_ip(request).await {
        Ok(created) => {
            info!(
                "Created floating IP {} (ID: {}) for FloatingIP {}",
                created.ip, created.id, name
            );
            Ok(bound_status(
                fip,
                current,
                created.id,
                created.ip.clone(),
                created.home_location.name.clone(),
                now,
                REASON_PROVISIONED,
                format!("floating IP {} allocated", created.ip),
            ))
        }
        Err(e) if e.is_permanent() => {
            warn!("FloatingIP {} spec rejected by the provider: {}", name, e);
            Ok(rejected_status(
                fip,
                current,
                now,
                REASON_INVALID_SPEC,
                e.to_string(),
                FloatingIPPhase::Failed,
            ))
        }
        Err(e) => Err(e.into()),
    }
}

/// Verify the live provider record and re-apply drifted mutable fields.
async fn sync(
    client: &dyn HcloudClientTrait,
    fip: &FloatingIP,
    provider_id: i64,
    current: &FloatingIPStatus,
    now: DateTime<Utc>,
) -> Result<FloatingIPStatus, ControllerError> {
    let name = fip.name_any();

    let live = match client.get_floating_ip(provider_id).await {
        Ok(live) => live,
        Err(e) if e.is_not_found() => {
            // The recorded allocation vanished out-of-band. Re-creating here
            // would break the one-resource-one-allocation guarantee, so the
            // resource is parked for operator remediation instead.
            error!(
                "Floating IP {} recorded for FloatingIP {} no longer exists on the provider side",
                provider_id, name
            );
            return Ok(missing_status(fip, current, now));
        }
        Err(e) => return Err(e.into()),
    };

    let desired_description = fip.spec.description.clone().unwrap_or_default();
    let live_description = live.description.clone().unwrap_or_default();
    let drifted = live_description != desired_description || live.labels != fip.spec.labels;

    if drifted {
        info!("FloatingIP {} diverged from spec, re-applying mutable fields", name);
        let request = UpdateFloatingIpRequest {
            description: Some(desired_description),
            labels: Some(fip.spec.labels.clone()),
        };
        match client.update_floating_ip(provider_id, request).await {
            Ok(_) => {}
            Err(e) if e.is_permanent() => {
                warn!("FloatingIP {} update rejected by the provider: {}", name, e);
                return Ok(rejected_status(
                    fip,
                    current,
                    now,
                    REASON_INVALID_SPEC,
                    e.to_string(),
                    FloatingIPPhase::Failed,
                ));
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(bound_status(
        fip,
        current,
        provider_id,
        current.ip.clone().unwrap_or(live.ip),
        current.location.clone().unwrap_or(live.home_location.name),
        now,
        REASON_IN_SYNC,
        "floating IP matches the spec",
    ))
}

/// The immutable spec field a change was attempted on, if any.
///
/// Checked against the recorded allocation (protocol version derives from
/// the allocated address, location is recorded at creation time), so no
/// provider call is needed.
pub(crate) fn immutable_violation(
    fip: &FloatingIP,
    status: &FloatingIPStatus,
) -> Option<&'static str> {
    if let Some(ip) = &status.ip {
        if ProtocolVersion::of_ip(ip) != fip.spec.protocol_version {
            return Some("protocolVersion");
        }
    }
    if let Some(location) = &status.location {
        if *location != fip.spec.location {
            return Some("location");
        }
    }
    None
}

fn ip_type_for(version: ProtocolVersion) -> FloatingIpType {
    match version {
        ProtocolVersion::V4 => FloatingIpType::Ipv4,
        ProtocolVersion::V6 => FloatingIpType::Ipv6,
    }
}

/// `Some(next)` when the projected status differs from the stored one.
fn changed(current: &FloatingIPStatus, next: FloatingIPStatus) -> Option<FloatingIPStatus> {
    (next != *current).then_some(next)
}

fn bound_status(
    fip: &FloatingIP,
    current: &FloatingIPStatus,
    provider_id: i64,
    ip: String,
    location: String,
    now: DateTime<Utc>,
    reason: &str,
    message: impl Into<String>,
) -> FloatingIPStatus {
    let mut desired = vec![
        ready(true, reason, message),
        progressing_done(reason, "reconciliation complete"),
    ];
    let was_degraded = current
        .conditions
        .iter()
        .any(|c| c.type_ == crds::CONDITION_DEGRADED && c.status == crds::ConditionStatus::True);
    if was_degraded {
        desired.push(degraded_cleared(REASON_RECOVERED, "reconciliation recovered"));
    }

    FloatingIPStatus {
        provider_id: Some(provider_id),
        ip: Some(ip),
        location: Some(location),
        phase: FloatingIPPhase::Bound,
        conditions: merge_conditions(&current.conditions, desired, now, fip.metadata.generation),
        observed_generation: fip.metadata.generation,
        last_synced: Some(now),
    }
}

/// Spec rejection: surfaces `Ready=False` without touching the recorded
/// allocation.
fn rejected_status(
    fip: &FloatingIP,
    current: &FloatingIPStatus,
    now: DateTime<Utc>,
    reason: &str,
    message: String,
    phase: FloatingIPPhase,
) -> FloatingIPStatus {
    FloatingIPStatus {
        provider_id: current.provider_id,
        ip: current.ip.clone(),
        location: current.location.clone(),
        phase,
        conditions: merge_conditions(
            &current.conditions,
            vec![ready(false, reason, message), progressing_done(reason, "reconciliation halted")],
            now,
            fip.metadata.generation,
        ),
        observed_generation: fip.metadata.generation,
        last_synced: current.last_synced,
    }
}

/// Recorded provider ID resolves to nothing: terminal until remediated.
fn missing_status(
    fip: &FloatingIP,
    current: &FloatingIPStatus,
    now: DateTime<Utc>,
) -> FloatingIPStatus {
    let message = format!(
        "floating IP {} no longer exists in Hetzner Cloud; manual remediation required",
        current.provider_id.unwrap_or_default()
    );
    FloatingIPStatus {
        provider_id: current.provider_id,
        ip: current.ip.clone(),
        location: current.location.clone(),
        phase: FloatingIPPhase::Failed,
        conditions: merge_conditions(
            &current.conditions,
            vec![
                ready(false, REASON_PROVIDER_RESOURCE_MISSING, message.clone()),
                degraded(REASON_PROVIDER_RESOURCE_MISSING, message),
            ],
            now,
            fip.metadata.generation,
        ),
        observed_generation: fip.metadata.generation,
        last_synced: Some(now),
    }
}

/// Progress marker written while a provider operation is being retried.
pub(crate) fn in_flight_status(fip: &FloatingIP, now: DateTime<Utc>) -> FloatingIPStatus {
    let current = fip.status.clone().unwrap_or_default();
    let (phase, reason, message) = if fip.metadata.deletion_timestamp.is_some() {
        (FloatingIPPhase::Deleting, REASON_DELETING, "deleting the floating IP")
    } else if current.provider_id.is_none() {
        (FloatingIPPhase::Provisioning, REASON_PROVISIONING, "allocating a floating IP")
    } else {
        (FloatingIPPhase::Updating, REASON_UPDATING, "updating the floating IP")
    };

    let conditions = merge_conditions(
        &current.conditions,
        vec![progressing(reason, message)],
        now,
        fip.metadata.generation,
    );
    FloatingIPStatus {
        phase,
        conditions,
        // Deliberately not advanced: the spec has not been applied yet.
        observed_generation: current.observed_generation,
        last_synced: current.last_synced,
        ..current
    }
}

/// Terminal status after the transient-error retry budget ran out.
pub(crate) fn retries_exhausted_status(
    fip: &FloatingIP,
    now: DateTime<Utc>,
    error: &ControllerError,
) -> FloatingIPStatus {
    let current = fip.status.clone().unwrap_or_default();
    let conditions = merge_conditions(
        &current.conditions,
        vec![
            degraded(REASON_RETRIES_EXHAUSTED, format!("giving up after repeated failures: {error}")),
            progressing_done(REASON_RETRIES_EXHAUSTED, "retry budget exhausted"),
        ],
        now,
        fip.metadata.generation,
    );
    FloatingIPStatus {
        phase: FloatingIPPhase::Failed,
        conditions,
        observed_generation: fip.metadata.generation,
        last_synced: current.last_synced,
        ..current
    }
}

/// Terminal status after cleanup was rejected outright.
fn cleanup_failed_status(
    fip: &FloatingIP,
    now: DateTime<Utc>,
    error: &ControllerError,
) -> FloatingIPStatus {
    let current = fip.status.clone().unwrap_or_default();
    let conditions = merge_conditions(
        &current.conditions,
        vec![degraded(REASON_CLEANUP_FAILED, format!("cleanup failed: {error}"))],
        now,
        fip.metadata.generation,
    );
    FloatingIPStatus {
        phase: FloatingIPPhase::Failed,
        conditions,
        observed_generation: fip.metadata.generation,
        last_synced: current.last_synced,
        ..current
    }
}
