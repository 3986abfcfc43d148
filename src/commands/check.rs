//! Check command implementation

use anyhow::Result;
use k8s_openapi::api::core::v1::Node;
use kube::Api;
use std::path::PathBuf;

use crate::cloud::Cloud;
use crate::k8s::client::create_client;
use crate::utils::preflight::{CheckResult, PreflightChecker};

/// Options for `check`
#[derive(Debug, Clone)]
pub struct CheckOptions {
    pub live: bool,
    pub cloud: String,
    pub node_name: String,
    pub kubeconfig: Option<PathBuf>,
}

/// Check the environment, and with `live` the cluster and cloud
pub async fn check(options: CheckOptions) -> Result<()> {
    crate::log_info!("Checking prerequisites...");

    let mut checker = PreflightChecker::new();
    checker.check_environment();

    if options.live {
        match create_client(options.kubeconfig.as_deref()).await {
            Ok(client) => {
                let nodes: Api<Node> = Api::all(client);
                checker.check_cluster(&nodes, &options.node_name).await;
            }
            Err(e) => checker.push(CheckResult::Fail(format!("Cannot connect to cluster: {:#}", e))),
        }

        match Cloud::new(&options.cloud).await {
            Ok(mut cloud) => {
                checker.push(CheckResult::Pass(format!("Created {} session", options.cloud)));
                checker.check_cloud(&mut cloud, &options.node_name).await;
            }
            Err(e) => checker.push(CheckResult::Fail(e.to_string())),
        }
    }

    if checker.display_results() {
        Ok(())
    } else {
        anyhow::bail!("Preflight checks failed")
    }
}
