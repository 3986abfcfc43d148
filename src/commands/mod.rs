//! Command implementations for the ccm-e2e CLI

pub mod check;
pub mod cleanup;
pub mod test;
