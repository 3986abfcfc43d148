//! Cloud abstraction for provisioning test nodes
//!
//! [`Cloud`] is constructed from a cloud type string and forwards node
//! operations to the matching [`CloudProvider`]. Only OpenStack is
//! implemented; adding a cloud means adding a [`CloudType`] variant and a
//! provider, not another dispatch branch per operation.

pub mod error;
pub mod openstack;
pub mod provider_id;

#[cfg(test)]
pub(crate) mod fake;

pub use error::CloudError;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use self::openstack::OpenStackCloud;

/// Information about a node as reported by the cloud
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub name: String,
    pub provider_id: String,
    pub instance_type: String,
}

/// Supported cloud types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudType {
    OpenStack,
}

impl CloudType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudType::OpenStack => "openstack",
        }
    }
}

impl FromStr for CloudType {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openstack" => Ok(CloudType::OpenStack),
            other => Err(CloudError::UnsupportedProvider(other.to_string())),
        }
    }
}

impl fmt::Display for CloudType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Node operations every cloud provider implements
///
/// Methods take `&mut self`: providers may cache per-service clients lazily,
/// and a single scenario drives each provider instance.
#[async_trait]
pub trait CloudProvider: Send {
    /// Look up a node by exact name
    async fn get_node(&mut self, name: &str) -> Result<NodeInfo, CloudError>;

    /// Create a node and return its authoritative information
    async fn create_node(&mut self, name: &str) -> Result<NodeInfo, CloudError>;

    /// Delete the node identified by `node.provider_id`
    async fn delete_node(&mut self, node: &NodeInfo) -> Result<(), CloudError>;
}

/// The cloud underlying the Kubernetes cluster under test
pub struct Cloud {
    provider_type: CloudType,
    provider: Box<dyn CloudProvider>,
}

impl Cloud {
    /// Create a cloud client for the given cloud type, authenticating from the environment
    pub async fn new(provider_type: &str) -> Result<Self, CloudError> {
        let cloud_type: CloudType = provider_type.parse()?;

        let provider: Box<dyn CloudProvider> = match cloud_type {
            CloudType::OpenStack => Box::new(OpenStackCloud::from_env().await?),
        };

        Ok(Self::with_provider(cloud_type, provider))
    }

    /// Wrap an already constructed provider
    pub fn with_provider(provider_type: CloudType, provider: Box<dyn CloudProvider>) -> Self {
        Self {
            provider_type,
            provider,
        }
    }

    pub fn provider_type(&self) -> CloudType {
        self.provider_type
    }

    /// Retrieve information about the node with the given name
    pub async fn get_node(&mut self, name: &str) -> Result<NodeInfo, CloudError> {
        tracing::debug!(cloud = %self.provider_type, node = name, "Looking up node");
        self.provider.get_node(name).await
    }

    /// Create a node and return its information
    pub async fn create_node(&mut self, name: &str) -> Result<NodeInfo, CloudError> {
        tracing::debug!(cloud = %self.provider_type, node = name, "Creating node");
        self.provider.create_node(name).await
    }

    /// Delete a node
    pub async fn delete_node(&mut self, node: &NodeInfo) -> Result<(), CloudError> {
        tracing::debug!(
            cloud = %self.provider_type,
            provider_id = %node.provider_id,
            "Deleting node"
        );
        self.provider.delete_node(node).await
    }
}

impl fmt::Debug for Cloud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cloud")
            .field("provider_type", &self.provider_type)
            .finish_non_exhaustive()
    }
}
