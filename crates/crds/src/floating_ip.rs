//! FloatingIP CRD
//!
//! Declares a Hetzner Cloud floating IP. The controller allocates the
//! address on first reconcile and keeps the provider-side record in sync
//! with the spec until the resource is deleted.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::condition::Condition;

/// Finalizer placed on every FloatingIP that owns a provider-side
/// allocation. Removed only after the cloud resource is confirmed gone.
pub const FLOATING_IP_FINALIZER: &str = "hcloud.microscaler.io/floating-ip-finalizer";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "hcloud.microscaler.io",
    version = "v1alpha1",
    kind = "FloatingIP",
    status = "FloatingIPStatus",
    printcolumn = r#"{"name":"IP", "type":"string", "jsonPath":".status.ip"}"#,
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct FloatingIPSpec {
    /// IP protocol version of the floating IP. Immutable after creation.
    #[serde(default)]
    pub protocol_version: ProtocolVersion,

    /// Hetzner Cloud location the floating IP is homed in (e.g. "fsn1").
    /// Immutable after creation.
    pub location: String,

    /// Description applied to the floating IP in Hetzner Cloud.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Labels applied to the floating IP in Hetzner Cloud.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// IP protocol version
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub enum ProtocolVersion {
    /// IPv4
    #[default]
    #[serde(rename = "v4")]
    V4,

    /// IPv6
    #[serde(rename = "v6")]
    V6,
}

impl ProtocolVersion {
    /// Derive the protocol version from an address string.
    #[must_use]
    pub fn of_ip(ip: &str) -> Self {
        if ip.contains(':') { Self::V6 } else { Self::V4 }
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V4 => write!(f, "v4"),
            Self::V6 => write!(f, "v6"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FloatingIPStatus {
    /// Hetzner Cloud ID of the floating IP. Set exactly once on successful
    /// creation; never cleared while the resource exists.
    #[serde(rename = "providerID", default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<i64>,

    /// Allocated address. Immutable once set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    /// Location the floating IP was created in. Recorded so that
    /// immutable-field changes can be rejected without a provider call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Lifecycle phase
    pub phase: FloatingIPPhase,

    /// Status conditions, merged by type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// The metadata.generation most recently acted upon
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Last time the provider-side record was verified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced: Option<chrono::DateTime<chrono::Utc>>,
}

/// Floating IP lifecycle phase
///
/// Serializes as PascalCase ("Bound", "Failed", etc.).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub enum FloatingIPPhase {
    /// No provider-side allocation yet
    #[default]
    Pending,

    /// Create call in flight
    Provisioning,

    /// Allocated and in sync
    Bound,

    /// Mutable-field sync in flight
    Updating,

    /// Deletion-intent observed, cleanup in flight
    Deleting,

    /// Terminal until the spec or status changes externally
    Failed,
}

impl FloatingIP {
    /// Whether the controller's finalizer is present on the resource.
    #[must_use]
    pub fn has_finalizer(&self) -> bool {
        self.metadata
            .finalizers
            .as_ref()
            .is_some_and(|fs| fs.iter().any(|f| f == FLOATING_IP_FINALIZER))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::CustomResourceExt;

    #[test]
    fn test_protocol_version_serde() {
        assert_eq!(serde_json::to_string(&ProtocolVersion::V4).unwrap(), "\"v4\"");
        assert_eq!(serde_json::to_string(&ProtocolVersion::V6).unwrap(), "\"v6\"");
        let v: ProtocolVersion = serde_json::from_str("\"v6\"").unwrap();
        assert_eq!(v, ProtocolVersion::V6);
    }

    #[test]
    fn test_protocol_version_of_ip() {
        assert_eq!(ProtocolVersion::of_ip("192.0.2.1"), ProtocolVersion::V4);
        assert_eq!(ProtocolVersion::of_ip("2001:db8::1"), ProtocolVersion::V6);
    }

    #[test]
    fn test_phase_serializes_pascal_case() {
        assert_eq!(
            serde_json::to_string(&FloatingIPPhase::Bound).unwrap(),
            "\"Bound\""
        );
        assert_eq!(
            serde_json::to_string(&FloatingIPPhase::Failed).unwrap(),
            "\"Failed\""
        );
    }

    #[test]
    fn test_crd_is_cluster_scoped() {
        let crd = FloatingIP::crd();
        assert_eq!(crd.spec.scope, "Cluster");
        assert_eq!(crd.spec.names.kind, "FloatingIP");
    }

    #[test]
    fn test_spec_defaults() {
        let spec: FloatingIPSpec =
            serde_json::from_str(r#"{"location": "fsn1"}"#).unwrap();
        assert_eq!(spec.protocol_version, ProtocolVersion::V4);
        assert!(spec.description.is_none());
        assert!(spec.labels.is_empty());
    }

    #[test]
    fn test_has_finalizer() {
        let mut fip: FloatingIP = FloatingIP::new("test", FloatingIPSpec {
            protocol_version: ProtocolVersion::V4,
            location: "fsn1".to_string(),
            description: None,
            labels: BTreeMap::new(),
        });
        assert!(!fip.has_finalizer());
        fip.metadata.finalizers = Some(vec![FLOATING_IP_FINALIZER.to_string()]);
        assert!(fip.has_finalizer());
    }
}
