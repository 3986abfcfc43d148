//! Configuration file support for ccm-e2e

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::k8s::nodes::{RegistrationCondition, WaitOptions};
use crate::scenario::DEFAULT_NODE_NAME;

/// Name of the per-project config file
pub const LOCAL_CONFIG_FILE: &str = ".ccm-e2e.toml";

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub registration: Registration,

    #[serde(default)]
    pub colors: Colors,

    #[serde(default)]
    pub behavior: Behavior,
}

/// Default values for test runs
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Defaults {
    #[serde(default = "default_cloud")]
    pub cloud: String,

    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// Append a random suffix to the node name
    #[serde(default)]
    pub randomize_name: bool,

    /// Kubeconfig of the cluster under test.
    /// If not set, KUBECONFIG or the in-cluster config is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<String>,
}

/// How long and how often to poll for the node
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Registration {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_initial_interval_secs")]
    pub initial_interval_secs: u64,

    #[serde(default = "default_max_interval_secs")]
    pub max_interval_secs: u64,

    #[serde(default)]
    pub condition: RegistrationCondition,
}

/// Color settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Colors {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Behavior settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Behavior {
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

// Default value functions
fn default_cloud() -> String {
    "openstack".to_string()
}

fn default_node_name() -> String {
    DEFAULT_NODE_NAME.to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_initial_interval_secs() -> u64 {
    2
}

fn default_max_interval_secs() -> u64 {
    20
}

fn default_true() -> bool {
    true
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            cloud: default_cloud(),
            node_name: default_node_name(),
            randomize_name: false,
            kubeconfig: None,
        }
    }
}

impl Default for Registration {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            initial_interval_secs: default_initial_interval_secs(),
            max_interval_secs: default_max_interval_secs(),
            condition: RegistrationCondition::default(),
        }
    }
}

impl Default for Colors {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            show_progress: default_true(),
        }
    }
}

impl Registration {
    /// Polling options for the node wait
    pub fn to_wait_options(&self) -> WaitOptions {
        let initial_interval = Duration::from_secs(self.initial_interval_secs.max(1));
        WaitOptions {
            timeout: Duration::from_secs(self.timeout_secs),
            initial_interval,
            max_interval: Duration::from_secs(self.max_interval_secs).max(initial_interval),
            condition: self.condition,
        }
        .clamped()
    }
}

impl Settings {
    /// Load settings from file or return defaults
    pub fn load() -> Self {
        let Some(path) = Self::find_config_file() else {
            return Self::default();
        };

        match Self::load_from_file(&path) {
            Ok(settings) => {
                tracing::debug!(path = %path.display(), "Loaded config file");
                settings
            }
            Err(e) => {
                crate::log_warn!("Ignoring config file: {:#}", e);
                Self::default()
            }
        }
    }

    /// Load settings from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(settings)
    }

    /// Find config file in standard locations
    /// Priority:
    /// 1. .ccm-e2e.toml in current directory
    /// 2. ~/.config/ccm-e2e/config.toml (XDG config directory)
    fn find_config_file() -> Option<PathBuf> {
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Some(local_config);
        }

        let xdg_config = dirs::config_dir()?.join("ccm-e2e").join("config.toml");
        xdg_config.exists().then_some(xdg_config)
    }

    /// Generate example config file content
    pub fn example_config() -> String {
        let header = "# ccm-e2e configuration file\n\
                      # Place this file at ~/.config/ccm-e2e/config.toml or .ccm-e2e.toml in your project\n\n";

        match toml::to_string_pretty(&Settings::default()) {
            Ok(config) => format!("{}{}", header, config),
            Err(_) => format!(
                r#"{header}[defaults]
cloud = "openstack"
node_name = "{DEFAULT_NODE_NAME}"
randomize_name = false
# kubeconfig = "/path/to/kubeconfig"  # Optional: defaults to KUBECONFIG

[registration]
timeout_secs = 300
initial_interval_secs = 2
max_interval_secs = 20
condition = "initialized"  # Options: present, initialized, ready

[colors]
enabled = true

[behavior]
show_progress = true
"#
            ),
        }
    }
}
