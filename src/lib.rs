//! ccm-e2e: end-to-end tests for a cloud-controller-manager's node controller
//!
//! Creates a node in the cloud, waits for it to register with the cluster,
//! verifies the cloud metadata on the node object, and deletes the node.

pub mod cloud;
pub mod commands;
pub mod config;
pub mod k8s;
pub mod scenario;
pub mod utils;
