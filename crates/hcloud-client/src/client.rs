//! Hetzner Cloud API client
//!
//! Implements the floating IP subset of the Hetzner Cloud REST API.
//! Endpoints: /floating_ips and /locations (token validation).

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::error::HcloudError;
use crate::guard::InflightGuard;
use crate::hcloud_trait::HcloudClientTrait;
use crate::models::{
    ApiErrorResponse, CreateFloatingIpRequest, FloatingIp, FloatingIpListResponse,
    FloatingIpResponse, UpdateFloatingIpRequest,
};

/// Hetzner Cloud API client
pub struct HcloudClient {
    client: Client,
    base_url: String,
    token: String,
    guard: InflightGuard,
}

impl HcloudClient {
    /// Create a new Hetzner Cloud client
    ///
    /// # Arguments
    /// * `base_url` - API base URL (e.g., "https://api.hetzner.cloud/v1")
    /// * `token` - API token for authentication
    pub fn new(base_url: String, token: String) -> Result<Self, HcloudError> {
        // The request timeout doubles as the per-call deadline: an elapsed
        // deadline surfaces as a transient error and triggers a requeue.
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(HcloudError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            guard: InflightGuard::new(),
        })
    }

    /// Map a non-success response to an [`HcloudError`].
    ///
    /// The API reports errors as `{"error": {"code", "message"}}`; the code
    /// is kept so operators can match it against the Hetzner documentation.
    fn error_from_response(status: StatusCode, body: &str, context: &str) -> HcloudError {
        let (code, message) = match serde_json::from_str::<ApiErrorResponse>(body) {
            Ok(parsed) => (parsed.error.code, parsed.error.message),
            Err(_) => (
                status.as_str().to_string(),
                body.chars().take(500).collect::<String>(),
            ),
        };

        match status.as_u16() {
            404 => HcloudError::NotFound(format!("{context}: {message}")),
            401 | 403 => HcloudError::Authentication(format!("{context}: {code}: {message}")),
            429 => HcloudError::RateLimited(format!("{context}: {message}")),
            422 => HcloudError::InvalidRequest(format!("{context}: {code}: {message}")),
            s => HcloudError::Api {
                status: s,
                code,
                message: format!("{context}: {message}"),
            },
        }
    }

    async fn read_error(
        response: reqwest::Response,
        context: &str,
    ) -> HcloudError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Self::error_from_response(status, &body, context)
    }
}

#[async_trait::async_trait]
impl HcloudClientTrait for HcloudClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Validate the API token by making a lightweight authenticated request
    /// against the locations endpoint.
    async fn validate_token(&self) -> Result<(), HcloudError> {
        let url = format!("{}/locations?per_page=1", self.base_url);
        debug!("Validating Hetzner Cloud token and connectivity");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(HcloudError::Http)?;

        if !response.status().is_success() {
            return Err(Self::read_error(response, "token validation failed").await);
        }

        debug!("Token validated successfully");
        Ok(())
    }

    async fn create_floating_ip(
        &self,
        request: CreateFloatingIpRequest,
    ) -> Result<FloatingIp, HcloudError> {
        let url = format!("{}/floating_ips", self.base_url);
        debug!(
            location = %request.home_location,
            "Creating floating IP in Hetzner Cloud"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(HcloudError::Http)?;

        if !response.status().is_success() {
            return Err(Self::read_error(response, "failed to create floating IP").await);
        }

        let created: FloatingIpResponse = response.json().await.map_err(HcloudError::Http)?;
        Ok(created.floating_ip)
    }

    async fn get_floating_ip(&self, id: i64) -> Result<FloatingIp, HcloudError> {
        let _permit = self.guard.acquire(id).await;
        let url = format!("{}/floating_ips/{}", self.base_url, id);
        debug!("Fetching floating IP {} from Hetzner Cloud", id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(HcloudError::Http)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(HcloudError::NotFound(format!("floating IP {id} not found")));
        }
        if !response.status().is_success() {
            return Err(
                Self::read_error(response, &format!("failed to get floating IP {id}")).await,
            );
        }

        let fetched: FloatingIpResponse = response.json().await.map_err(HcloudError::Http)?;
        Ok(fetched.floating_ip)
    }

    async fn update_floating_ip(
        &self,
        id: i64,
        request: UpdateFloatingIpRequest,
    ) -> Result<FloatingIp, HcloudError> {
        let _permit = self.guard.acquire(id).await;
        let url = format!("{}/floating_ips/{}", self.base_url, id);
        debug!("Updating floating IP {} in Hetzner Cloud", id);

        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(HcloudError::Http)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(HcloudError::NotFound(format!("floating IP {id} not found")));
        }
        if !response.status().is_success() {
            return Err(
                Self::read_error(response, &format!("failed to update floating IP {id}")).await,
            );
        }

        let updated: FloatingIpResponse = response.json().await.map_err(HcloudError::Http)?;
        Ok(updated.floating_ip)
    }

    async fn delete_floating_ip(&self, id: i64) -> Result<(), HcloudError> {
        let _permit = self.guard.acquire(id).await;
        let url = format!("{}/floating_ips/{}", self.base_url, id);
        debug!("Deleting floating IP {} in Hetzner Cloud", id);

        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(HcloudError::Http)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(HcloudError::NotFound(format!("floating IP {id} not found")));
        }
        if !response.status().is_success() {
            return Err(
                Self::read_error(response, &format!("failed to delete floating IP {id}")).await,
            );
        }

        Ok(())
    }

    async fn list_floating_ips(
        &self,
        filters: &[(&str, &str)],
    ) -> Result<Vec<FloatingIp>, HcloudError> {
        let mut url = format!("{}/floating_ips", self.base_url);
        if !filters.is_empty() {
            let query: Vec<String> = filters
                .iter()
                .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                .collect();
            url = format!("{}?{}", url, query.join("&"));
        }
        debug!("Listing floating IPs from Hetzner Cloud");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(HcloudError::Http)?;

        if !response.status().is_success() {
            return Err(Self::read_error(response, "failed to list floating IPs").await);
        }

        let listed: FloatingIpListResponse = response.json().await.map_err(HcloudError::Http)?;
        Ok(listed.floating_ips)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_from_response_maps_status_codes() {
        let body = r#"{"error": {"code": "rate_limit_exceeded", "message": "slow down"}}"#;
        let err = HcloudClient::error_from_response(
            StatusCode::TOO_MANY_REQUESTS,
            body,
            "create",
        );
        assert!(matches!(err, HcloudError::RateLimited(_)));
        assert!(err.is_transient());

        let body = r#"{"error": {"code": "invalid_input", "message": "unknown location"}}"#;
        let err =
            HcloudClient::error_from_response(StatusCode::UNPROCESSABLE_ENTITY, body, "create");
        assert!(matches!(err, HcloudError::InvalidRequest(_)));
        assert!(err.is_permanent());

        let err = HcloudClient::error_from_response(StatusCode::NOT_FOUND, "{}", "get");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_error_from_response_handles_non_json_body() {
        let err = HcloudClient::error_from_response(
            StatusCode::BAD_GATEWAY,
            "<html>bad gateway</html>",
            "get",
        );
        assert!(err.is_transient());
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = HcloudClient::new(
            "https://api.hetzner.cloud/v1/".to_string(),
            "token".to_string(),
        )
        .unwrap();
        assert_eq!(client.base_url(), "https://api.hetzner.cloud/v1");
    }
}
