//! Progress indicators for long-running operations

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a spinner for indeterminate operations
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg} [{elapsed}]")
            .expect("Failed to create spinner template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Spinner shown while waiting for a node to register
pub struct WaitProgress {
    pb: ProgressBar,
    node: String,
}

impl WaitProgress {
    pub fn new(node: &str) -> Self {
        let message = format!("Waiting for node {} to register", node);
        Self {
            pb: create_spinner(&message),
            node: node.to_string(),
        }
    }

    /// Hidden progress, for non-interactive runs
    pub fn hidden(node: &str) -> Self {
        Self {
            pb: ProgressBar::hidden(),
            node: node.to_string(),
        }
    }

    pub fn update(&self, status: &str) {
        self.pb.set_message(format!("node {}: {}", self.node, status));
    }

    pub fn finish_success(&self) {
        self.pb
            .finish_with_message(format!("✓ node {} registered", self.node));
    }

    pub fn finish_error(&self, error: &str) {
        self.pb
            .finish_with_message(format!("✗ node {}: {}", self.node, error));
    }
}
