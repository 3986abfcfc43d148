//! Utility modules for ccm-e2e

pub mod errors;
pub mod logger;
pub mod preflight;
pub mod prereqs;
pub mod progress;

// Re-export commonly used items
pub use errors::{display_error_and_exit, enhance_error, E2eError};
pub use logger::{log_error, log_info, log_warn};
pub use prereqs::{CommonPrereqs, Prerequisite};
