//! Preflight validation checks before running the tests

use colored::Colorize;

use super::prereqs::{CommonPrereqs, Prerequisite};
use crate::cloud::Cloud;
use crate::k8s::nodes::{self, NodeLister};

/// Result of a preflight check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckResult {
    Pass(String),
    Warn(String),
    Fail(String),
}

impl CheckResult {
    pub fn is_error(&self) -> bool {
        matches!(self, CheckResult::Fail(_))
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, CheckResult::Warn(_))
    }

    pub fn display(&self) {
        match self {
            CheckResult::Pass(msg) => {
                println!("  {} {}", "✓".green(), msg);
            }
            CheckResult::Warn(msg) => {
                println!("  {} {}", "⚠".yellow(), msg);
            }
            CheckResult::Fail(msg) => {
                println!("  {} {}", "✗".red(), msg);
            }
        }
    }
}

/// Collects preflight check results
#[derive(Debug, Default)]
pub struct PreflightChecker {
    checks: Vec<CheckResult>,
}

impl PreflightChecker {
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    pub fn checks(&self) -> &[CheckResult] {
        &self.checks
    }

    pub fn push(&mut self, result: CheckResult) {
        self.checks.push(result);
    }

    /// Check the OS_* variables the OpenStack client reads
    pub fn check_environment(&mut self) {
        let required: Vec<_> = CommonPrereqs::openstack_auth()
            .into_iter()
            .chain(CommonPrereqs::openstack_test_node())
            .collect();
        let required: Vec<&dyn Prerequisite> =
            required.iter().map(|p| p as &dyn Prerequisite).collect();

        let (found, missing) = CommonPrereqs::check_all(&required);
        for name in found {
            self.checks.push(CheckResult::Pass(format!("{} is set", name)));
        }
        for (name, hint) in missing {
            self.checks
                .push(CheckResult::Fail(format!("{} is not set ({})", name, hint)));
        }

        let recommended = CommonPrereqs::openstack_recommended();
        let recommended: Vec<&dyn Prerequisite> =
            recommended.iter().map(|p| p as &dyn Prerequisite).collect();
        let (_, missing) = CommonPrereqs::check_all(&recommended);
        for (name, hint) in missing {
            self.checks
                .push(CheckResult::Warn(format!("{} is not set ({})", name, hint)));
        }
    }

    /// Check the cluster is reachable and has no stale test node
    pub async fn check_cluster<L>(&mut self, lister: &L, node_name: &str)
    where
        L: NodeLister + ?Sized,
    {
        match lister.list_nodes().await {
            Ok(list) => {
                self.checks.push(CheckResult::Pass(format!(
                    "Cluster is reachable ({} nodes)",
                    list.len()
                )));

                if let Some(node) = nodes::find_node(list, node_name) {
                    self.checks.push(CheckResult::Warn(format!(
                        "Node {} is already registered ({})",
                        node_name,
                        nodes::registration_status(&node)
                    )));
                }
            }
            Err(e) => {
                self.checks
                    .push(CheckResult::Fail(format!("Cannot list cluster nodes: {}", e)));
            }
        }
    }

    /// Check the cloud answers and has no leftover test node
    pub async fn check_cloud(&mut self, cloud: &mut Cloud, node_name: &str) {
        match cloud.get_node(node_name).await {
            Err(e) if e.is_not_found() => {
                self.checks.push(CheckResult::Pass(format!(
                    "No leftover {} server named {}",
                    cloud.provider_type(),
                    node_name
                )));
            }
            Ok(node) => {
                self.checks.push(CheckResult::Warn(format!(
                    "Server {} already exists ({}); remove it with 'ccm-e2e cleanup'",
                    node_name, node.provider_id
                )));
            }
            Err(e) => {
                self.checks
                    .push(CheckResult::Fail(format!("Cannot list cloud servers: {}", e)));
            }
        }
    }

    /// Display results and return whether the tests can run
    pub fn display_results(&self) -> bool {
        println!();

        let errors = self.checks.iter().filter(|c| c.is_error()).count();
        let warnings = self.checks.iter().filter(|c| c.is_warning()).count();

        for check in &self.checks {
            check.display();
        }

        println!();

        if errors > 0 {
            println!("{} error(s), {} warning(s)", errors, warnings);
            false
        } else if warnings > 0 {
            println!(
                "{} warning(s). Tests may run but proceed with caution.",
                warnings
            );
            true
        } else {
            println!("{}", "All checks passed!".green());
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::fake::FakeCloud;
    use crate::cloud::CloudType;
    use crate::k8s::nodes::testing::{node, ScriptedLister};

    #[test]
    fn test_check_result_is_error() {
        let pass = CheckResult::Pass("test".to_string());
        let warn = CheckResult::Warn("test".to_string());
        let fail = CheckResult::Fail("test".to_string());

        assert!(!pass.is_error());
        assert!(!warn.is_error());
        assert!(fail.is_error());
    }

    #[test]
    fn test_check_result_is_warning() {
        let pass = CheckResult::Pass("test".to_string());
        let warn = CheckResult::Warn("test".to_string());
        let fail = CheckResult::Fail("test".to_string());

        assert!(!pass.is_warning());
        assert!(warn.is_warning());
        assert!(!fail.is_warning());
    }

    #[tokio::test]
    async fn test_check_cluster_warns_on_stale_node() {
        let lister = ScriptedLister::new(vec![vec![
            node("worker-0", "openstack:///w0", "m1.large"),
            node("ccm-test", "openstack:///abc123", "m1.small"),
        ]]);

        let mut checker = PreflightChecker::new();
        checker.check_cluster(&lister, "ccm-test").await;

        assert_eq!(
            checker.checks(),
            &[
                CheckResult::Pass("Cluster is reachable (2 nodes)".to_string()),
                CheckResult::Warn("Node ccm-test is already registered (Ready)".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_check_cloud() {
        let fake = FakeCloud::new("m1.small");
        let mut cloud = Cloud::with_provider(CloudType::OpenStack, Box::new(fake));

        let mut checker = PreflightChecker::new();
        checker.check_cloud(&mut cloud, "ccm-test").await;
        assert!(!checker.checks()[0].is_warning());
        assert!(!checker.checks()[0].is_error());

        cloud.create_node("ccm-test").await.unwrap();
        checker.check_cloud(&mut cloud, "ccm-test").await;
        assert!(checker.checks()[1].is_warning());
        assert!(checker.display_results());
    }

    #[test]
    fn test_display_results_fails_on_error() {
        let mut checker = PreflightChecker::new();
        checker.push(CheckResult::Pass("ok".to_string()));
        checker.push(CheckResult::Fail("broken".to_string()));
        assert!(!checker.display_results());
    }
}
