//! Hetzner Cloud API models
//!
//! These models match the Hetzner Cloud API schemas for floating IPs.
//! See: https://docs.hetzner.cloud/#floating-ips

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Floating IP object as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloatingIp {
    pub id: i64,
    pub name: String,
    /// Address; a single IP for IPv4, a /64 network address for IPv6
    pub ip: String,
    #[serde(rename = "type")]
    pub ip_type: FloatingIpType,
    pub description: Option<String>,
    pub home_location: Location,
    pub blocked: bool,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    pub created: String, // ISO 8601 datetime
}

/// IP protocol of a floating IP
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FloatingIpType {
    #[serde(rename = "ipv4")]
    Ipv4,
    #[serde(rename = "ipv6")]
    Ipv6,
}

/// Location object (nested in floating IP responses)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub name: String, // e.g., "fsn1"
    pub country: String,
    pub city: String,
    pub network_zone: String,
}

/// Request body for creating a floating IP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFloatingIpRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub ip_type: FloatingIpType,
    pub home_location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

/// Request body for updating the mutable fields of a floating IP
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFloatingIpRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

/// Response wrapper for single floating IP endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloatingIpResponse {
    pub floating_ip: FloatingIp,
}

/// Response wrapper for the floating IP list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloatingIpListResponse {
    pub floating_ips: Vec<FloatingIp>,
}

/// Error body returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

/// Error detail inside an [`ApiErrorResponse`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}
