//! Verification results for a registered node

use colored::Colorize;
use k8s_openapi::api::core::v1::Node;
use std::fmt;

use crate::cloud::NodeInfo;
use crate::k8s::nodes;

/// Outcome of a single assertion against the registered node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

impl Check {
    fn new(name: &'static str, passed: bool, detail: String) -> Self {
        Self {
            name,
            passed,
            detail,
        }
    }
}

/// All checks run against one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub node: String,
    pub checks: Vec<Check>,
}

impl VerificationReport {
    /// Compare the cluster's node object with what the cloud reported
    pub fn verify(expected: &NodeInfo, node: &Node) -> Self {
        let provider_id = nodes::provider_id(node);
        let instance_type = nodes::instance_type(node);
        let addresses = nodes::addresses(node);

        let checks = vec![
            Check::new(
                "with cloud specific provider ID",
                provider_id == Some(expected.provider_id.as_str()),
                format!(
                    "expected {}, got {}",
                    expected.provider_id,
                    provider_id.unwrap_or("<unset>")
                ),
            ),
            Check::new(
                "with cloud specific instance type label",
                instance_type == Some(expected.instance_type.as_str()),
                format!(
                    "expected {}={}, got {}",
                    nodes::INSTANCE_TYPE_LABEL,
                    expected.instance_type,
                    instance_type.unwrap_or("<unset>")
                ),
            ),
            Check::new(
                "with the cloud provided address / hostname",
                !addresses.is_empty(),
                if addresses.is_empty() {
                    "no addresses reported".to_string()
                } else {
                    addresses
                        .iter()
                        .map(|a| format!("{}={}", a.type_, a.address))
                        .collect::<Vec<_>>()
                        .join(", ")
                },
            ),
        ];

        Self {
            node: expected.name.clone(),
            checks,
        }
    }

    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &Check> {
        self.checks.iter().filter(|c| !c.passed)
    }

    /// Print the report to stdout
    pub fn display(&self) {
        println!();
        println!("Node Controller: node {}", self.node.bold());
        for check in &self.checks {
            if check.passed {
                println!("  {} {}", "✓".green(), check.name);
            } else {
                println!("  {} {} ({})", "✗".red(), check.name, check.detail);
            }
        }
        println!();
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failures: Vec<_> = self
            .failures()
            .map(|c| format!("{} ({})", c.name, c.detail))
            .collect();

        if failures.is_empty() {
            write!(f, "all {} checks passed", self.checks.len())
        } else {
            write!(f, "{}", failures.join("; "))
        }
    }
}
