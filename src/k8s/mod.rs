//! Kubernetes operations

pub mod client;
pub mod nodes;
