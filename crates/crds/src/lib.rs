//! FloatingIP operator CRD definitions
//!
//! Kubernetes Custom Resource Definitions for the Hetzner Cloud
//! floating IP controller.

pub mod condition;
pub mod floating_ip;

pub use condition::*;
pub use floating_ip::*;
