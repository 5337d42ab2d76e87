//! Mock HcloudClient for unit testing
//!
//! In-memory implementation of [`HcloudClientTrait`] used by reconciler
//! unit tests. Stores floating IPs in a map, records every call, and can
//! be primed with failures for specific operations.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::error::HcloudError;
use crate::hcloud_trait::HcloudClientTrait;
use crate::models::{
    CreateFloatingIpRequest, FloatingIp, FloatingIpType, Location, UpdateFloatingIpRequest,
};

/// Mock HcloudClient for testing
///
/// Failure injection: `fail_next("create", err)` queues an error that the
/// next `create_floating_ip` call returns instead of executing. Each call
/// is recorded by operation name, so tests can assert exactly which
/// provider calls a reconcile pass issued.
#[derive(Clone)]
pub struct MockHcloudClient {
    base_url: String,
    floating_ips: Arc<Mutex<HashMap<i64, FloatingIp>>>,
    failures: Arc<Mutex<HashMap<String, VecDeque<HcloudError>>>>,
    calls: Arc<Mutex<Vec<String>>>,
    next_id: Arc<Mutex<i64>>,
}

impl MockHcloudClient {
    /// Create a new mock client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            floating_ips: Arc::new(Mutex::new(HashMap::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    /// Add a floating IP to the mock store (for test setup)
    pub fn add_floating_ip(&self, fip: FloatingIp) {
        self.floating_ips.lock().unwrap().insert(fip.id, fip);
    }

    /// Queue an error for the next call of `op` ("create", "get", "update",
    /// "delete", "list")
    pub fn fail_next(&self, op: &str, err: HcloudError) {
        self.failures
            .lock()
            .unwrap()
            .entry(op.to_string())
            .or_default()
            .push_back(err);
    }

    /// All recorded operation names, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded calls for one operation
    pub fn call_count(&self, op: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == op).count()
    }

    /// Snapshot of the stored floating IPs
    pub fn stored(&self) -> Vec<FloatingIp> {
        self.floating_ips.lock().unwrap().values().cloned().collect()
    }

    /// Record a call and pop a queued failure, if any
    fn record(&self, op: &str) -> Option<HcloudError> {
        self.calls.lock().unwrap().push(op.to_string());
        self.failures
            .lock()
            .unwrap()
            .get_mut(op)
            .and_then(VecDeque::pop_front)
    }

    /// Generate next ID
    fn next_id(&self) -> i64 {
        let mut id = self.next_id.lock().unwrap();
        let current = *id;
        *id += 1;
        current
    }

    fn mock_location(name: &str) -> Location {
        Location {
            id: 1,
            name: name.to_string(),
            country: "DE".to_string(),
            city: "Falkenstein".to_string(),
            network_zone: "eu-central".to_string(),
        }
    }
}

#[async_trait::async_trait]
impl HcloudClientTrait for MockHcloudClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn validate_token(&self) -> Result<(), HcloudError> {
        Ok(())
    }

    async fn create_floating_ip(
        &self,
        request: CreateFloatingIpRequest,
    ) -> Result<FloatingIp, HcloudError> {
        if let Some(err) = self.record("create") {
            return Err(err);
        }

        let id = self.next_id();
        let ip = match request.ip_type {
            FloatingIpType::Ipv4 => format!("192.0.2.{id}"),
            FloatingIpType::Ipv6 => format!("2001:db8:{id:x}::"),
        };

        let fip = FloatingIp {
            id,
            name: request.name.unwrap_or_else(|| format!("floating-ip-{id}")),
            ip,
            ip_type: request.ip_type,
            description: request.description,
            home_location: Self::mock_location(&request.home_location),
            blocked: false,
            labels: request.labels.unwrap_or_default(),
            created: chrono::Utc::now().to_rfc3339(),
        };

        self.floating_ips.lock().unwrap().insert(id, fip.clone());
        Ok(fip)
    }

    async fn get_floating_ip(&self, id: i64) -> Result<FloatingIp, HcloudError> {
        if let Some(err) = self.record("get") {
            return Err(err);
        }

        self.floating_ips
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| HcloudError::NotFound(format!("floating IP {id} not found")))
    }

    async fn update_floating_ip(
        &self,
        id: i64,
        request: UpdateFloatingIpRequest,
    ) -> Result<FloatingIp, HcloudError> {
        if let Some(err) = self.record("update") {
            return Err(err);
        }

        let mut fips = self.floating_ips.lock().unwrap();
        let fip = fips
            .get_mut(&id)
            .ok_or_else(|| HcloudError::NotFound(format!("floating IP {id} not found")))?;

        if let Some(description) = request.description {
            fip.description = Some(description);
        }
        if let Some(labels) = request.labels {
            fip.labels = labels;
        }

        Ok(fip.clone())
    }

    async fn delete_floating_ip(&self, id: i64) -> Result<(), HcloudError> {
        if let Some(err) = self.record("delete") {
            return Err(err);
        }

        self.floating_ips
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| HcloudError::NotFound(format!("floating IP {id} not found")))
    }

    async fn list_floating_ips(
        &self,
        filters: &[(&str, &str)],
    ) -> Result<Vec<FloatingIp>, HcloudError> {
        if let Some(err) = self.record("list") {
            return Err(err);
        }

        let fips = self.floating_ips.lock().unwrap();
        let mut results: Vec<FloatingIp> = fips.values().cloned().collect();

        for (key, value) in filters {
            if *key == "name" {
                results.retain(|f| f.name == *value);
            }
        }
        results.sort_by_key(|f| f.id);

        Ok(results)
    }
}

/// Build a floating IP record for test setup.
pub fn mock_floating_ip(
    id: i64,
    name: &str,
    ip: &str,
    location: &str,
    description: Option<&str>,
    labels: BTreeMap<String, String>,
) -> FloatingIp {
    FloatingIp {
        id,
        name: name.to_string(),
        ip: ip.to_string(),
        ip_type: if ip.contains(':') {
            FloatingIpType::Ipv6
        } else {
            FloatingIpType::Ipv4
        },
        description: description.map(ToString::to_string),
        home_location: MockHcloudClient::mock_location(location),
        blocked: false,
        labels,
        created: chrono::Utc::now().to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_then_get_round_trip() {
        let mock = MockHcloudClient::new("http://mock-hcloud");
        let created = mock
            .create_floating_ip(CreateFloatingIpRequest {
                name: Some("test".to_string()),
                ip_type: FloatingIpType::Ipv4,
                home_location: "fsn1".to_string(),
                description: None,
                labels: None,
            })
            .await
            .unwrap();

        let fetched = mock.get_floating_ip(created.id).await.unwrap();
        assert_eq!(fetched.ip, created.ip);
        assert_eq!(mock.calls(), vec!["create", "get"]);
    }

    #[tokio::test]
    async fn test_fail_next_is_consumed_in_order() {
        let mock = MockHcloudClient::new("http://mock-hcloud");
        mock.fail_next("get", HcloudError::RateLimited("busy".to_string()));

        let err = mock.get_floating_ip(1).await.unwrap_err();
        assert!(err.is_transient());

        // Queue drained; the next call hits the store.
        let err = mock.get_floating_ip(1).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let mock = MockHcloudClient::new("http://mock-hcloud");
        let err = mock.delete_floating_ip(7).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
