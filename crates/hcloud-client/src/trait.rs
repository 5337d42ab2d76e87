//! HcloudClient trait for mocking
//!
//! This trait abstracts the HcloudClient so the reconciler can be unit
//! tested against an in-memory mock. The concrete HcloudClient implements
//! this trait.

use crate::error::HcloudError;
use crate::models::{CreateFloatingIpRequest, FloatingIp, UpdateFloatingIpRequest};

/// Trait for Hetzner Cloud API client operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing
/// runtime.
#[async_trait::async_trait]
pub trait HcloudClientTrait: Send + Sync {
    /// Get the base URL
    fn base_url(&self) -> &str;

    /// Validate the API token
    async fn validate_token(&self) -> Result<(), HcloudError>;

    /// Allocate a new floating IP
    async fn create_floating_ip(
        &self,
        request: CreateFloatingIpRequest,
    ) -> Result<FloatingIp, HcloudError>;

    /// Fetch a floating IP by its provider ID
    async fn get_floating_ip(&self, id: i64) -> Result<FloatingIp, HcloudError>;

    /// Update the mutable fields of a floating IP
    async fn update_floating_ip(
        &self,
        id: i64,
        request: UpdateFloatingIpRequest,
    ) -> Result<FloatingIp, HcloudError>;

    /// Delete a floating IP by its provider ID
    async fn delete_floating_ip(&self, id: i64) -> Result<(), HcloudError>;

    /// List floating IPs, optionally filtered (supported filters: `name`,
    /// `label_selector`)
    async fn list_floating_ips(
        &self,
        filters: &[(&str, &str)],
    ) -> Result<Vec<FloatingIp>, HcloudError>;

    /// Convenience: fetch a floating IP by name, `Ok(None)` when absent
    async fn get_floating_ip_by_name(
        &self,
        name: &str,
    ) -> Result<Option<FloatingIp>, HcloudError> {
        let found = self.list_floating_ips(&[("name", name)]).await?;
        Ok(found.into_iter().find(|f| f.name == name))
    }
}
