//! Hetzner Cloud client errors

use thiserror::Error;

/// Errors that can occur when interacting with the Hetzner Cloud API
#[derive(Debug, Error)]
pub enum HcloudError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Hetzner Cloud API returned an error
    #[error("Hetzner Cloud API error ({code}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Hetzner Cloud error code (e.g. "invalid_input")
        code: String,
        /// Error message from the API
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication failed (invalid token, expired, etc.)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request was rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Invalid request (e.g., unsupported location)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Coarse error classification consumed by the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Timeouts, connection errors, rate limits, 5xx responses; safe to
    /// retry with backoff.
    Transient,
    /// Validation and authentication failures; retrying without a spec or
    /// credential change cannot succeed.
    Permanent,
    /// The referenced resource does not exist on the provider side.
    NotFound,
}

impl HcloudError {
    /// Classify the error for retry decisions.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(_) | Self::RateLimited(_) => ErrorKind::Transient,
            Self::Api { status, .. } if *status >= 500 => ErrorKind::Transient,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Api { .. }
            | Self::Serialization(_)
            | Self::Authentication(_)
            | Self::InvalidRequest(_) => ErrorKind::Permanent,
        }
    }

    /// Whether the error is worth retrying with backoff.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    /// Whether the error means the resource is gone on the provider side.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Whether the error cannot be resolved by retrying.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        self.kind() == ErrorKind::Permanent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_is_transient() {
        let err = HcloudError::RateLimited("too many requests".to_string());
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert!(err.is_transient());
    }

    #[test]
    fn test_server_error_is_transient() {
        let err = HcloudError::Api {
            status: 503,
            code: "unavailable".to_string(),
            message: "service unavailable".to_string(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn test_invalid_input_is_permanent() {
        let err = HcloudError::InvalidRequest("unsupported location".to_string());
        assert!(err.is_permanent());
        let err = HcloudError::Api {
            status: 409,
            code: "conflict".to_string(),
            message: "locked".to_string(),
        };
        assert!(err.is_permanent());
    }

    #[test]
    fn test_not_found_is_its_own_kind() {
        let err = HcloudError::NotFound("floating IP 42 not found".to_string());
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!err.is_transient());
        assert!(!err.is_permanent());
    }
}
