//! Cleanup command implementation for leaked test nodes

use anyhow::{Context, Result};

use crate::cloud::Cloud;

/// Delete the cloud node left behind by an interrupted test run
pub async fn cleanup(cloud_type: &str, node_name: &str) -> Result<()> {
    crate::log_info!("Cleaning up test node {}...", node_name);

    let mut cloud = Cloud::new(cloud_type)
        .await
        .context("Failed to initialize cloud client")?;

    if delete_node_by_name(&mut cloud, node_name).await? {
        crate::log_info!("Cleanup complete!");
    }
    Ok(())
}

/// Look up `name` and delete it; returns false when there was nothing to delete
pub async fn delete_node_by_name(cloud: &mut Cloud, name: &str) -> Result<bool> {
    let node = match cloud.get_node(name).await {
        Ok(node) => node,
        Err(e) if e.is_not_found() => {
            crate::log_info!("No {} server named {}, nothing to clean up", cloud.provider_type(), name);
            return Ok(false);
        }
        Err(e) => return Err(e).context("Failed to look up test node"),
    };

    crate::log_info!("Deleting {} ({})", node.name, node.provider_id);
    cloud.delete_node(&node).await?;
    Ok(true)
}
