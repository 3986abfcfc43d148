//! Error types for cloud provider operations

use thiserror::Error;

/// Boxed error from a provider's transport layer
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum CloudError {
    #[error("{0} is an unsupported cloud provider")]
    UnsupportedProvider(String),

    #[error("{0} is an unsupported service")]
    UnsupportedService(String),

    #[error("Missing required environment variable {0}")]
    MissingEnv(&'static str),

    #[error("Failed to authenticate with {cloud}: {source}")]
    Authentication {
        cloud: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("Could not find node {0}")]
    NodeNotFound(String),

    #[error("Failed to {operation}: {source}")]
    Request {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("Failed to create node {name}: {source}")]
    Creation {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to delete node {provider_id}: {source}")]
    Deletion {
        provider_id: String,
        #[source]
        source: BoxError,
    },

    #[error("Provider ID '{provider_id}' does not start with '{expected_prefix}'")]
    InvalidProviderId {
        provider_id: String,
        expected_prefix: String,
    },
}

impl CloudError {
    /// Whether this error means the node simply does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::NodeNotFound(_))
    }
}
