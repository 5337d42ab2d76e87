//! Controller-specific error types.
//!
//! This module defines error types specific to the FloatingIP controller
//! that are not covered by upstream library errors.

use hcloud_client::HcloudError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the FloatingIP controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Hetzner Cloud API error
    #[error("Hetzner Cloud error: {0}")]
    Hcloud(#[from] HcloudError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

impl ControllerError {
    /// Whether this error should be retried with backoff.
    ///
    /// Kubernetes API errors are treated as transient; the provider
    /// classification is delegated to the client.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Kube(_) => true,
            Self::Hcloud(e) => e.is_transient(),
            Self::InvalidConfig(_) | Self::Watch(_) => false,
        }
    }
}
