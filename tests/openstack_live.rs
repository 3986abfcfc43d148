//! Tests against a real OpenStack cloud, configured through OS_* variables
//!
//! Run with `cargo test --test openstack_live -- --ignored`.

use ccm_e2e::cloud::Cloud;

async fn set_up() -> Cloud {
    Cloud::new("openstack")
        .await
        .expect("Failed to create an OpenStack session from the environment")
}

#[tokio::test]
#[ignore]
async fn test_missing_server_is_not_found() {
    let mut cloud = set_up().await;
    let err = cloud
        .get_node("ccm-e2e-does-not-exist-8f3k2")
        .await
        .expect_err("Server should not exist");
    assert!(err.is_not_found(), "unexpected error: {err}");
}

#[tokio::test]
#[ignore]
async fn test_create_and_delete_node() {
    let mut cloud = set_up().await;
    let name = ccm_e2e::scenario::randomized_name("ccm-e2e-live");

    let node = cloud.create_node(&name).await.expect("Cannot create server");
    assert_eq!(node.name, name);
    assert!(node.provider_id.starts_with("openstack:///"));

    let found = cloud.get_node(&name).await.expect("Cannot find created server");
    assert_eq!(found.provider_id, node.provider_id);

    cloud.delete_node(&node).await.expect("Cannot delete server");
}
