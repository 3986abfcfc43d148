//! Enhanced error types with actionable suggestions

use colored::Colorize;
use thiserror::Error;

use crate::cloud::CloudError;
use crate::k8s::nodes::WaitError;
use crate::scenario::ScenarioError;

/// Enhanced error with suggestions and documentation links
#[derive(Error, Debug)]
#[error("{message}")]
pub struct E2eError {
    pub message: String,
    pub suggestions: Vec<String>,
    pub docs_link: Option<String>,
}

impl E2eError {
    /// Create a new error with suggestions
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestions: Vec::new(),
            docs_link: None,
        }
    }

    /// Add a suggestion to the error
    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a documentation link
    pub fn with_docs(mut self, link: impl Into<String>) -> Self {
        self.docs_link = Some(link.into());
        self
    }

    /// Display the error with suggestions
    pub fn display(&self) {
        crate::log_error!("{}", self.message);
        eprintln!("{} {}", "Error:".red().bold(), self.message);

        if !self.suggestions.is_empty() {
            eprintln!();
            eprintln!("{}", "Suggestions:".yellow().bold());
            for suggestion in &self.suggestions {
                eprintln!("  {} {}", "→".blue(), suggestion);
            }
        }

        if let Some(docs) = &self.docs_link {
            eprintln!();
            eprintln!("{} {}", "Documentation:".cyan(), docs);
        }
    }

    // Common error patterns

    /// Unsupported cloud type
    pub fn unsupported_provider(name: &str) -> Self {
        Self::new(format!("{} is an unsupported cloud provider", name))
            .suggest("Supported clouds: openstack")
            .suggest("Set the cloud with --cloud or [defaults] cloud in .ccm-e2e.toml")
    }

    /// Missing environment variable
    pub fn missing_env(var: &str) -> Self {
        Self::new(format!("Environment variable {} is not set", var))
            .suggest("Source your openrc file before running the tests")
            .suggest("Run 'ccm-e2e check' to list every required variable")
    }

    /// Cloud authentication failed
    pub fn authentication_failed(reason: &str) -> Self {
        Self::new(format!("Cloud authentication failed: {}", reason))
            .suggest("Verify OS_AUTH_URL points at the Keystone v3 endpoint")
            .suggest("Check OS_USERNAME, OS_PASSWORD and the project/domain variables")
            .with_docs("https://docs.openstack.org/python-openstackclient/latest/cli/authentication.html")
    }

    /// Node created in the cloud never showed up in the cluster
    pub fn node_not_registered(name: &str, reason: &str) -> Self {
        Self::new(format!("Node {} did not register with the cluster: {}", name, reason))
            .suggest("Check that OS_TEST_USER_DATA joins the instance to the cluster")
            .suggest("Check the cloud-controller-manager logs for node controller errors")
            .suggest("Increase the wait with --timeout")
    }

    /// Node metadata did not match the cloud
    pub fn verification_failed(reason: &str) -> Self {
        Self::new(format!("Node verification failed: {}", reason))
            .suggest("Check the cloud-controller-manager logs for node controller errors")
            .suggest("Verify the cluster runs kubelet with --cloud-provider=external")
    }

    /// Cloud resource may have leaked
    pub fn cleanup_needed(reason: &str) -> Self {
        Self::new(format!("Failed to delete test node: {}", reason))
            .suggest("Remove it with: ccm-e2e cleanup --node-name <name>")
            .suggest("Or delete the server manually: openstack server delete <id>")
    }

    /// Kubeconfig not found error
    pub fn kubeconfig_not_found(path: &str) -> Self {
        Self::new(format!("Kubeconfig not found: {}", path))
            .suggest("Verify the cluster exists")
            .suggest("Use --kubeconfig or KUBECONFIG to point at the cluster under test")
    }

    /// Connection timeout error
    pub fn connection_timeout(resource: &str) -> Self {
        Self::new(format!("Timeout waiting for {}", resource))
            .suggest("Check if the cluster is healthy")
            .suggest("Verify network connectivity")
    }
}

/// Helper to display error and exit
pub fn display_error_and_exit(error: E2eError) -> ! {
    error.display();
    std::process::exit(1);
}

/// Convert anyhow error to E2eError when possible
pub fn enhance_error(err: anyhow::Error) -> E2eError {
    let message = chain_message(&err);

    for cause in err.chain() {
        if let Some(scenario) = cause.downcast_ref::<ScenarioError>() {
            return match scenario {
                ScenarioError::Registration { name, source } => match source {
                    WaitError::Cancelled { .. } => E2eError::new(message),
                    _ => E2eError::node_not_registered(name, &source.to_string()),
                },
                ScenarioError::Verification { .. } => E2eError::verification_failed(&message),
                ScenarioError::Teardown(_) => E2eError::cleanup_needed(&message),
                ScenarioError::Create(cloud) => enhance_cloud_error(cloud, message),
            };
        }
        if let Some(cloud) = cause.downcast_ref::<CloudError>() {
            return enhance_cloud_error(cloud, message);
        }
    }

    if message.contains("Kubeconfig not found") {
        let path = message.rsplit(": ").next().unwrap_or("unknown");
        return E2eError::kubeconfig_not_found(path);
    }

    if message.contains("connection refused") || message.contains("timed out") {
        return E2eError::connection_timeout("cluster");
    }

    // Default error with generic suggestion
    E2eError::new(message)
        .suggest("Run with --verbose for more details")
        .suggest("Check logs for additional context")
}

/// Join the error chain, skipping causes already included in their parent's message
fn chain_message(err: &anyhow::Error) -> String {
    let mut message = String::new();
    for cause in err.chain() {
        let text = cause.to_string();
        if message.ends_with(&text) {
            continue;
        }
        if !message.is_empty() {
            message.push_str(": ");
        }
        message.push_str(&text);
    }
    message
}

fn enhance_cloud_error(err: &CloudError, message: String) -> E2eError {
    match err {
        CloudError::UnsupportedProvider(name) => E2eError::unsupported_provider(name),
        CloudError::MissingEnv(var) => E2eError::missing_env(var),
        CloudError::Authentication { source, .. } => E2eError::authentication_failed(&source.to_string()),
        CloudError::Creation { source, .. } => match source.downcast_ref::<CloudError>() {
            Some(CloudError::MissingEnv(var)) => E2eError::missing_env(var),
            _ => E2eError::new(message).suggest("Check the OS_TEST_* variables and your project quota"),
        },
        CloudError::Deletion { .. } => E2eError::cleanup_needed(&message),
        _ => E2eError::new(message).suggest("Run with --verbose for more details"),
    }
}
