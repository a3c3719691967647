//! Declarative descriptor for the Azure deployment.
//!
//! This module only *declares* resources and the data dependencies between
//! their inputs and outputs. Diffing, ordering and idempotent apply are the
//! provisioning engine's job; nothing here talks to Azure.

pub mod config;
pub mod output;
pub mod resources;
pub mod stack;

pub use config::StackConfig;
pub use output::{Output, OutputError, Resolver};
pub use stack::Stack;
