//! Node lookup and registration waiting

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, NodeAddress};
use kube::api::{Api, ListParams};
use kube::ResourceExt;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::utils::progress::WaitProgress;

/// Well-known instance type label set by the cloud node controller
pub const INSTANCE_TYPE_LABEL: &str = "node.kubernetes.io/instance-type";

/// Deprecated instance type label, still set by older controllers
pub const LEGACY_INSTANCE_TYPE_LABEL: &str = "beta.kubernetes.io/instance-type";

/// Taint kubelet adds with `--cloud-provider=external`, removed once the
/// cloud node controller has initialized the node
pub const UNINITIALIZED_TAINT: &str = "node.cloudprovider.kubernetes.io/uninitialized";

/// Source of the cluster's current node list
#[async_trait]
pub trait NodeLister: Send + Sync {
    async fn list_nodes(&self) -> Result<Vec<Node>, kube::Error>;
}

#[async_trait]
impl NodeLister for Api<Node> {
    async fn list_nodes(&self) -> Result<Vec<Node>, kube::Error> {
        Ok(self.list(&ListParams::default()).await?.items)
    }
}

/// Take the node named exactly `name` out of a listing
pub fn find_node(nodes: Vec<Node>, name: &str) -> Option<Node> {
    nodes
        .into_iter()
        .find(|n| n.metadata.name.as_deref() == Some(name))
}

pub fn provider_id(node: &Node) -> Option<&str> {
    node.spec.as_ref()?.provider_id.as_deref()
}

/// Instance type label, preferring the stable key over the legacy one
pub fn instance_type(node: &Node) -> Option<&str> {
    let labels = node.labels();
    labels
        .get(INSTANCE_TYPE_LABEL)
        .or_else(|| labels.get(LEGACY_INSTANCE_TYPE_LABEL))
        .map(String::as_str)
}

pub fn addresses(node: &Node) -> &[NodeAddress] {
    node.status
        .as_ref()
        .and_then(|s| s.addresses.as_deref())
        .unwrap_or_default()
}

/// Whether the cloud node controller has removed the uninitialized taint
pub fn is_initialized(node: &Node) -> bool {
    !node
        .spec
        .as_ref()
        .and_then(|s| s.taints.as_ref())
        .is_some_and(|taints| taints.iter().any(|t| t.key == UNINITIALIZED_TAINT))
}

pub fn is_ready(node: &Node) -> bool {
    node.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        })
}

/// Short human-readable registration state
pub fn registration_status(node: &Node) -> &'static str {
    if !is_initialized(node) {
        "registered, awaiting cloud initialization"
    } else if !is_ready(node) {
        "initialized, not Ready"
    } else {
        "Ready"
    }
}

/// When a node counts as registered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationCondition {
    /// The node object exists
    Present,
    /// The node exists and the cloud node controller has initialized it
    #[default]
    Initialized,
    /// The node is initialized and its Ready condition is True
    Ready,
}

impl RegistrationCondition {
    pub fn is_met(&self, node: &Node) -> bool {
        match self {
            RegistrationCondition::Present => true,
            RegistrationCondition::Initialized => is_initialized(node),
            RegistrationCondition::Ready => is_initialized(node) && is_ready(node),
        }
    }
}

/// Longest registration wait accepted from flags or config
pub const MAX_WAIT_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Longest pause between two node listings
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Polling parameters for [`wait_for_node`]
#[derive(Debug, Clone)]
pub struct WaitOptions {
    pub timeout: Duration,
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub condition: RegistrationCondition,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            initial_interval: Duration::from_secs(2),
            max_interval: Duration::from_secs(20),
            condition: RegistrationCondition::default(),
        }
    }
}

impl WaitOptions {
    /// Bound the timeout and intervals so deadline and delay math cannot overflow
    pub fn clamped(mut self) -> Self {
        self.timeout = self.timeout.min(MAX_WAIT_TIMEOUT);
        self.max_interval = self.max_interval.min(MAX_POLL_INTERVAL);
        self.initial_interval = self.initial_interval.min(self.max_interval);
        self
    }
}

#[derive(Error, Debug)]
pub enum WaitError {
    #[error("Could not find node {name} within {timeout:?} (last status: {last_status})")]
    Timeout {
        name: String,
        timeout: Duration,
        last_status: String,
    },

    #[error("Cancelled while waiting for node {name}")]
    Cancelled { name: String },

    #[error("Failed to list nodes: {0}")]
    List(#[from] kube::Error),
}

/// Poll the node list until `name` satisfies `options.condition`
///
/// Intervals double from `initial_interval` up to `max_interval` with
/// jitter. Returns when the condition holds, the timeout elapses, or
/// `shutdown` resolves. A failed list call ends the wait immediately.
pub async fn wait_for_node<L, S>(
    lister: &L,
    name: &str,
    options: &WaitOptions,
    progress: Option<&WaitProgress>,
    shutdown: S,
) -> Result<Node, WaitError>
where
    L: NodeLister + ?Sized,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let options = options.clone().clamped();
    let deadline = Instant::now() + options.timeout;
    let mut interval = options.initial_interval;
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        let status = match find_node(lister.list_nodes().await?, name) {
            Some(node) if options.condition.is_met(&node) => {
                tracing::info!(node = name, attempt, "Node registered");
                return Ok(node);
            }
            Some(node) => registration_status(&node),
            None => "not registered",
        };

        tracing::debug!(node = name, attempt, status, "Node not yet registered");
        if let Some(progress) = progress {
            progress.update(status);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(WaitError::Timeout {
                name: name.to_string(),
                timeout: options.timeout,
                last_status: status.to_string(),
            });
        }

        // Jitter: 0.5x to 1.5x of the interval, never past the deadline
        let jitter = rand::thread_rng().gen_range(0.5..1.5);
        let delay = interval.mul_f64(jitter).min(deadline - now);

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = &mut shutdown => {
                return Err(WaitError::Cancelled { name: name.to_string() });
            }
        }

        interval = interval.saturating_mul(2).min(options.max_interval);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use k8s_openapi::api::core::v1::{NodeCondition, NodeSpec, NodeStatus, Taint};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Build a node the way a cloud node controller leaves it
    pub fn node(name: &str, provider_id: &str, instance_type: &str) -> Node {
        Node {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: Some(BTreeMap::from([(
                    INSTANCE_TYPE_LABEL.to_string(),
                    instance_type.to_string(),
                )])),
                ..Default::default()
            },
            spec: Some(NodeSpec {
                provider_id: Some(provider_id.to_string()),
                ..Default::default()
            }),
            status: Some(NodeStatus {
                addresses: Some(vec![NodeAddress {
                    address: "10.0.0.12".to_string(),
                    type_: "InternalIP".to_string(),
                }]),
                conditions: Some(vec![NodeCondition {
                    type_: "Ready".to_string(),
                    status: "True".to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
        }
    }

    /// A node kubelet has registered but the cloud controller has not touched
    pub fn uninitialized_node(name: &str) -> Node {
        Node {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            spec: Some(NodeSpec {
                taints: Some(vec![Taint {
                    key: UNINITIALIZED_TAINT.to_string(),
                    value: Some("true".to_string()),
                    effect: "NoSchedule".to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            status: None,
        }
    }

    /// Lister that replays a fixed sequence of listings, repeating the last
    pub struct ScriptedLister {
        listings: Mutex<Vec<Vec<Node>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedLister {
        pub fn new(listings: Vec<Vec<Node>>) -> Self {
            Self {
                listings: Mutex::new(listings),
                calls: Mutex::new(0),
            }
        }

        pub fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl NodeLister for ScriptedLister {
        async fn list_nodes(&self) -> Result<Vec<Node>, kube::Error> {
            *self.calls.lock().unwrap() += 1;
            let mut listings = self.listings.lock().unwrap();
            if listings.len() > 1 {
                Ok(listings.remove(0))
            } else {
                Ok(listings.first().cloned().unwrap_or_default())
            }
        }
    }
}
