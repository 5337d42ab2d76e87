//! Integration tests for the Hetzner Cloud client
//!
//! These tests require a real Hetzner Cloud project token and create real
//! (billed) resources. Set HCLOUD_TOKEN to run.

use hcloud_client::{
    CreateFloatingIpRequest, FloatingIpType, HcloudClient, HcloudClientTrait,
    UpdateFloatingIpRequest,
};

fn client_from_env() -> HcloudClient {
    let url = std::env::var("HCLOUD_ENDPOINT")
        .unwrap_or_else(|_| "https://api.hetzner.cloud/v1".to_string());
    let token = std::env::var("HCLOUD_TOKEN")
        .expect("HCLOUD_TOKEN environment variable must be set");
    HcloudClient::new(url, token).expect("Failed to create client")
}

#[tokio::test]
#[ignore] // Requires a Hetzner Cloud token and creates billed resources
async fn test_validate_token() {
    let client = client_from_env();
    client.validate_token().await.expect("Token validation failed");
}

#[tokio::test]
#[ignore]
async fn test_list_floating_ips() {
    let client = client_from_env();
    let fips = client
        .list_floating_ips(&[])
        .await
        .expect("Failed to list floating IPs");
    println!("Found {} floating IPs", fips.len());
}

#[tokio::test]
#[ignore]
async fn test_create_update_and_delete_floating_ip() {
    let client = client_from_env();

    let request = CreateFloatingIpRequest {
        name: Some("hcloud-client-integration-test".to_string()),
        ip_type: FloatingIpType::Ipv4,
        home_location: "fsn1".to_string(),
        description: Some("integration test, safe to delete".to_string()),
        labels: None,
    };

    let fip = client
        .create_floating_ip(request)
        .await
        .expect("Failed to create floating IP");
    println!("Created floating IP: {} (ID: {})", fip.ip, fip.id);

    let updated = client
        .update_floating_ip(
            fip.id,
            UpdateFloatingIpRequest {
                description: Some("updated by integration test".to_string()),
                labels: None,
            },
        )
        .await
        .expect("Failed to update floating IP");
    assert_eq!(
        updated.description.as_deref(),
        Some("updated by integration test")
    );

    // Clean up
    client
        .delete_floating_ip(fip.id)
        .await
        .expect("Failed to delete floating IP");
}

#[tokio::test]
#[ignore]
async fn test_get_missing_floating_ip_is_not_found() {
    let client = client_from_env();
    let err = client
        .get_floating_ip(i64::MAX)
        .await
        .expect_err("expected NotFound");
    assert!(err.is_not_found());
}
