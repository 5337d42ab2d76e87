//! Hetzner Cloud REST API Client
//!
//! A Rust client library for the subset of the Hetzner Cloud API the
//! FloatingIP operator needs: floating IP create/get/update/delete plus
//! listing for startup adoption.
//!
//! # Example
//!
//! ```no_run
//! use hcloud_client::{HcloudClient, HcloudClientTrait, CreateFloatingIpRequest, FloatingIpType};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Create a client
//! let client = HcloudClient::new(
//!     "https://api.hetzner.cloud/v1".to_string(),
//!     "your-api-token".to_string(),
//! )?;
//!
//! // Allocate a floating IP
//! let request = CreateFloatingIpRequest {
//!     name: Some("ingress".to_string()),
//!     ip_type: FloatingIpType::Ipv4,
//!     home_location: "fsn1".to_string(),
//!     description: Some("cluster ingress".to_string()),
//!     labels: None,
//! };
//! let fip = client.create_floating_ip(request).await?;
//! println!("allocated {}", fip.ip);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Error classification**: every error reports a [`ErrorKind`] of
//!   `Transient`, `Permanent`, or `NotFound`, so callers never inspect
//!   raw provider error shapes
//! - **Per-resource call guard**: get/update/delete calls for the same
//!   floating IP ID are serialized
//! - **Mocking**: [`MockHcloudClient`] behind the `test-util` feature

pub mod client;
pub mod error;
pub mod guard;
pub mod models;
#[path = "trait.rs"]
pub mod hcloud_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::HcloudClient;
pub use error::{ErrorKind, HcloudError};
pub use guard::InflightGuard;
pub use hcloud_trait::HcloudClientTrait;
pub use models::*;
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockHcloudClient;
