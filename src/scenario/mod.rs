//! Node controller scenario: create a cloud node, wait for it to register,
//! verify the cloud metadata on the node object, then delete it
//!
//! Phases share a [`ScenarioContext`] instead of suite-wide state. Once the
//! cloud node exists, teardown runs whatever happens afterwards.

pub mod report;

pub use report::{Check, VerificationReport};

use k8s_openapi::api::core::v1::Node;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::future::Future;
use thiserror::Error;

use crate::cloud::{Cloud, CloudError, NodeInfo};
use crate::k8s::nodes::{self, NodeLister, WaitError, WaitOptions};
use crate::utils::progress::WaitProgress;

/// Default name of the node the scenario creates
pub const DEFAULT_NODE_NAME: &str = "ccm-test";

const NAME_SUFFIX_LEN: usize = 5;

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Setup failed: {0}")]
    Create(#[source] CloudError),

    #[error("Node {name} did not register with the cluster: {source}")]
    Registration {
        name: String,
        #[source]
        source: WaitError,
    },

    #[error("Node {node} failed verification: {report}")]
    Verification {
        node: String,
        report: VerificationReport,
    },

    #[error("Teardown failed: {0}")]
    Teardown(#[source] CloudError),
}

/// Scenario parameters
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    pub node_name: String,
    pub wait: WaitOptions,
    pub show_progress: bool,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            node_name: DEFAULT_NODE_NAME.to_string(),
            wait: WaitOptions::default(),
            show_progress: true,
        }
    }
}

/// State handed from setup to verify and teardown
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    /// What the cloud reported for the created node
    pub node_info: NodeInfo,
    /// The cluster's node object, once registered
    pub node: Option<Node>,
}

/// Append a random lowercase suffix so concurrent runs don't collide
pub fn randomized_name(base: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NAME_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{}-{}", base, suffix)
}

pub struct NodeControllerScenario<L> {
    cloud: Cloud,
    nodes: L,
    config: ScenarioConfig,
}

impl<L: NodeLister> NodeControllerScenario<L> {
    pub fn new(cloud: Cloud, nodes: L, config: ScenarioConfig) -> Self {
        Self {
            cloud,
            nodes,
            config,
        }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Run setup, verify and teardown
    ///
    /// If verification and teardown both fail, the teardown error is logged
    /// and the earlier error returned.
    pub async fn run<S>(&mut self, shutdown: S) -> Result<VerificationReport, ScenarioError>
    where
        S: Future<Output = ()>,
    {
        let mut ctx = self.setup().await?;

        let outcome = self.register_and_verify(&mut ctx, shutdown).await;
        let teardown = self.teardown(&ctx).await;

        match (outcome, teardown) {
            (Ok(report), Ok(())) => Ok(report),
            (Err(e), Ok(())) | (Ok(_), Err(e)) => Err(e),
            (Err(e), Err(teardown_err)) => {
                crate::log_error!("{}", teardown_err);
                Err(e)
            }
        }
    }

    /// Create the cloud node
    pub async fn setup(&mut self) -> Result<ScenarioContext, ScenarioError> {
        let name = &self.config.node_name;
        crate::log_info!("Creating {} node {}", self.cloud.provider_type(), name);

        let node_info = self
            .cloud
            .create_node(name)
            .await
            .map_err(ScenarioError::Create)?;

        crate::log_info!(
            "Created node {} (provider ID {}, instance type {})",
            node_info.name,
            node_info.provider_id,
            node_info.instance_type
        );

        Ok(ScenarioContext {
            node_info,
            node: None,
        })
    }

    async fn register_and_verify<S>(
        &mut self,
        ctx: &mut ScenarioContext,
        shutdown: S,
    ) -> Result<VerificationReport, ScenarioError>
    where
        S: Future<Output = ()>,
    {
        self.wait_for_registration(ctx, shutdown).await?;
        self.verify(ctx)
    }

    /// Wait until the cluster lists the created node
    pub async fn wait_for_registration<S>(
        &mut self,
        ctx: &mut ScenarioContext,
        shutdown: S,
    ) -> Result<(), ScenarioError>
    where
        S: Future<Output = ()>,
    {
        let name = ctx.node_info.name.clone();
        let progress = if self.config.show_progress {
            WaitProgress::new(&name)
        } else {
            WaitProgress::hidden(&name)
        };

        match nodes::wait_for_node(&self.nodes, &name, &self.config.wait, Some(&progress), shutdown).await {
            Ok(node) => {
                progress.finish_success();
                ctx.node = Some(node);
                Ok(())
            }
            Err(source) => {
                progress.finish_error(&source.to_string());
                Err(ScenarioError::Registration { name, source })
            }
        }
    }

    /// Check the registered node carries the cloud's metadata
    pub fn verify(&self, ctx: &ScenarioContext) -> Result<VerificationReport, ScenarioError> {
        let Some(node) = ctx.node.as_ref() else {
            return Err(ScenarioError::Registration {
                name: ctx.node_info.name.clone(),
                source: WaitError::Timeout {
                    name: ctx.node_info.name.clone(),
                    timeout: self.config.wait.timeout,
                    last_status: "not registered".to_string(),
                },
            });
        };

        let report = VerificationReport::verify(&ctx.node_info, node);
        if report.passed() {
            Ok(report)
        } else {
            Err(ScenarioError::Verification {
                node: ctx.node_info.name.clone(),
                report,
            })
        }
    }

    /// Delete the cloud node
    pub async fn teardown(&mut self, ctx: &ScenarioContext) -> Result<(), ScenarioError> {
        crate::log_info!("Deleting node {} ({})", ctx.node_info.name, ctx.node_info.provider_id);

        self.cloud
            .delete_node(&ctx.node_info)
            .await
            .map_err(ScenarioError::Teardown)?;

        crate::log_info!("Deleted node {}", ctx.node_info.name);
        Ok(())
    }
}
