//! Test utilities for unit testing the reconciler
//!
//! Builders for FloatingIP resources and statuses in the shapes the state
//! machine tests need.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crds::{
    FloatingIP, FloatingIPPhase, FloatingIPSpec, FloatingIPStatus, ProtocolVersion,
    FLOATING_IP_FINALIZER,
};

/// Resync interval used by the state machine tests.
pub fn test_resync() -> chrono::Duration {
    chrono::Duration::minutes(5)
}

/// A FloatingIP as it looks right after the finalizer was added:
/// generation 1, no status.
pub fn create_test_floating_ip(name: &str, location: &str) -> FloatingIP {
    let mut fip = FloatingIP::new(
        name,
        FloatingIPSpec {
            protocol_version: ProtocolVersion::V4,
            location: location.to_string(),
            description: None,
            labels: BTreeMap::new(),
        },
    );
    fip.metadata.generation = Some(1);
    fip.metadata.finalizers = Some(vec![FLOATING_IP_FINALIZER.to_string()]);
    fip
}

/// A status for a resource bound to `provider_id`, observed at
/// `generation` and last verified at `synced_at`.
pub fn bound_test_status(
    provider_id: i64,
    ip: &str,
    location: &str,
    generation: i64,
    synced_at: DateTime<Utc>,
) -> FloatingIPStatus {
    FloatingIPStatus {
        provider_id: Some(provider_id),
        ip: Some(ip.to_string()),
        location: Some(location.to_string()),
        phase: FloatingIPPhase::Bound,
        conditions: Vec::new(),
        observed_generation: Some(generation),
        last_synced: Some(synced_at),
    }
}

/// Mark the resource for deletion.
pub fn mark_deleted(fip: &mut FloatingIP, at: DateTime<Utc>) {
    fip.metadata.deletion_timestamp =
        Some(k8s_openapi::apimachinery::pkg::apis::meta::v1::Time(at));
}
