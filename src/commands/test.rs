//! Test command implementation

use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::Node;
use kube::Api;
use std::path::PathBuf;

use crate::cloud::Cloud;
use crate::config::settings::Settings;
use crate::k8s::client::create_client;
use crate::k8s::nodes::WaitOptions;
use crate::scenario::{self, NodeControllerScenario, ScenarioConfig, ScenarioError};

/// Options for `test run`
#[derive(Debug, Clone)]
pub struct TestRunOptions {
    pub cloud: String,
    pub node_name: String,
    pub randomize_name: bool,
    pub kubeconfig: Option<PathBuf>,
    pub wait: WaitOptions,
    pub show_progress: bool,
}

impl TestRunOptions {
    /// Options from the config file; CLI flags override fields afterwards
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            cloud: settings.defaults.cloud.clone(),
            node_name: settings.defaults.node_name.clone(),
            randomize_name: settings.defaults.randomize_name,
            kubeconfig: settings.defaults.kubeconfig.as_ref().map(PathBuf::from),
            wait: settings.registration.to_wait_options(),
            show_progress: settings.behavior.show_progress,
        }
    }

    /// Name of the node to create
    pub fn effective_node_name(&self) -> String {
        if self.randomize_name {
            scenario::randomized_name(&self.node_name)
        } else {
            self.node_name.clone()
        }
    }
}

/// Run the node controller test against the current cluster
pub async fn run_node_controller_test(options: TestRunOptions) -> Result<()> {
    let node_name = options.effective_node_name();

    crate::log_info!("");
    crate::log_info!("==========================================");
    crate::log_info!("Node Controller e2e test");
    crate::log_info!("==========================================");
    crate::log_info!("Cloud: {}", options.cloud);
    crate::log_info!("Node: {}", node_name);
    crate::log_info!(
        "Registration: {:?}, timeout {}s",
        options.wait.condition,
        options.wait.timeout.as_secs()
    );
    crate::log_info!("");

    let client = create_client(options.kubeconfig.as_deref()).await?;
    let nodes: Api<Node> = Api::all(client);

    let cloud = Cloud::new(&options.cloud)
        .await
        .context("Failed to initialize cloud client")?;

    let mut scenario = NodeControllerScenario::new(
        cloud,
        nodes,
        ScenarioConfig {
            node_name,
            wait: options.wait,
            show_progress: options.show_progress,
        },
    );

    match scenario.run(shutdown_signal()).await {
        Ok(report) => {
            report.display();
            crate::log_info!("==========================================");
            crate::log_info!("All checks passed!");
            crate::log_info!("==========================================");
            Ok(())
        }
        Err(e) => {
            if let ScenarioError::Verification { report, .. } = &e {
                report.display();
            }
            Err(e).context("Node controller test failed")
        }
    }
}

/// Resolves on Ctrl-C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        crate::log_warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    crate::log_warn!("Interrupted, cleaning up test node...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::nodes::RegistrationCondition;
    use std::time::Duration;

    #[test]
    fn test_options_from_settings() {
        let mut settings = Settings::default();
        settings.defaults.kubeconfig = Some("/tmp/kubeconfig".to_string());
        settings.registration.timeout_secs = 60;
        settings.registration.condition = RegistrationCondition::Ready;
        settings.behavior.show_progress = false;

        let options = TestRunOptions::from_settings(&settings);
        assert_eq!(options.cloud, "openstack");
        assert_eq!(options.node_name, "ccm-test");
        assert_eq!(options.kubeconfig, Some(PathBuf::from("/tmp/kubeconfig")));
        assert_eq!(options.wait.timeout, Duration::from_secs(60));
        assert_eq!(options.wait.condition, RegistrationCondition::Ready);
        assert!(!options.show_progress);
    }

    #[test]
    fn test_effective_node_name() {
        let mut options = TestRunOptions::from_settings(&Settings::default());
        assert_eq!(options.effective_node_name(), "ccm-test");

        options.randomize_name = true;
        let name = options.effective_node_name();
        assert!(name.starts_with("ccm-test-"));
        assert_ne!(name, "ccm-test");
    }

    #[tokio::test]
    async fn test_missing_kubeconfig_fails_before_cloud() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = TestRunOptions::from_settings(&Settings::default());
        options.kubeconfig = Some(dir.path().join("missing.kubeconfig"));

        let err = run_node_controller_test(options).await.unwrap_err();
        assert!(err.to_string().contains("Kubeconfig not found"));
    }
}
