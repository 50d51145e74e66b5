//! GitHub provider implementations for rnflow.
//!
//! This crate provides [`workflow::GitHubActionsEmitter`], the
//! [`Emitter`](rnflow_engine::Emitter) that renders workflow plans as
//! GitHub Actions YAML (feature: `workflow`).
//!
//! # Features
//!
//! - `workflow` (default): GitHub Actions workflow file generation from plans

#![warn(missing_docs)]

#[cfg(feature = "workflow")]
pub mod workflow;

// Re-exports for convenience
#[cfg(feature = "workflow")]
pub use workflow::GitHubActionsEmitter;
