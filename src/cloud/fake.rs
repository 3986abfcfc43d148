//! In-memory cloud provider for tests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{provider_id, CloudError, CloudProvider, CloudType, NodeInfo};

#[derive(Debug, Default)]
pub(crate) struct FakeState {
    pub nodes: Vec<NodeInfo>,
    pub deleted: Vec<String>,
    pub next_id: u32,
    pub fail_create: bool,
    pub fail_delete: bool,
}

/// Provider that keeps nodes in memory and records deletions
pub(crate) struct FakeCloud {
    flavor: String,
    state: Arc<Mutex<FakeState>>,
}

impl FakeCloud {
    pub fn new(flavor: &str) -> Self {
        Self {
            flavor: flavor.to_string(),
            state: Arc::new(Mutex::new(FakeState::default())),
        }
    }

    /// Shared handle to inspect the provider after it has been boxed
    pub fn state(&self) -> Arc<Mutex<FakeState>> {
        Arc::clone(&self.state)
    }
}

#[async_trait]
impl CloudProvider for FakeCloud {
    async fn get_node(&mut self, name: &str) -> Result<NodeInfo, CloudError> {
        let state = self.state.lock().unwrap();
        state
            .nodes
            .iter()
            .find(|n| n.name == name)
            .cloned()
            .ok_or_else(|| CloudError::NodeNotFound(name.to_string()))
    }

    async fn create_node(&mut self, name: &str) -> Result<NodeInfo, CloudError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_create {
            return Err(CloudError::Creation {
                name: name.to_string(),
                source: "no valid host was found".into(),
            });
        }

        state.next_id += 1;
        let node = NodeInfo {
            name: name.to_string(),
            provider_id: provider_id::make(CloudType::OpenStack, &format!("fake-{}", state.next_id)),
            instance_type: self.flavor.clone(),
        };
        state.nodes.push(node.clone());
        Ok(node)
    }

    async fn delete_node(&mut self, node: &NodeInfo) -> Result<(), CloudError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_delete {
            return Err(CloudError::Deletion {
                provider_id: node.provider_id.clone(),
                source: "server is locked".into(),
            });
        }

        let raw_id = provider_id::parse(CloudType::OpenStack, &node.provider_id)?.to_string();
        state.nodes.retain(|n| n.provider_id != node.provider_id);
        state.deleted.push(raw_id);
        Ok(())
    }
}
