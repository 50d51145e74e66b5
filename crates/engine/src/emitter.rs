//! Workflow Emitter Trait
//!
//! Defines the interface for rendering a [`WorkflowPlan`] into a CI
//! platform's workflow file format.

use crate::plan::WorkflowPlan;
use miette::Diagnostic;
use thiserror::Error;

/// Error types for emitter operations
#[derive(Debug, Error, Diagnostic)]
pub enum EmitterError {
    /// YAML/JSON serialization failed
    #[error("Serialization failed: {0}")]
    #[diagnostic(code(rnflow::emit::serialization))]
    Serialization(String),

    /// Plan structure this emitter cannot render
    #[error("Invalid plan: {0}")]
    #[diagnostic(code(rnflow::emit::invalid_plan))]
    InvalidPlan(String),

    /// Plan feature this emitter does not support
    #[error("Unsupported feature '{feature}' for {emitter} emitter")]
    #[diagnostic(code(rnflow::emit::unsupported_feature))]
    UnsupportedFeature {
        /// Feature name
        feature: String,
        /// Emitter format name
        emitter: &'static str,
    },
}

/// Result type for emitter operations
pub type EmitterResult<T> = std::result::Result<T, EmitterError>;

/// Trait for workflow emitters
///
/// Implementations map plan concepts (jobs, steps, run-time fragments) onto a
/// specific CI platform. Output must be byte-identical for equal plans.
///
/// # Example
///
/// ```ignore
/// use rnflow_engine::{Emitter, EmitterResult, WorkflowPlan};
///
/// struct Summary;
///
/// impl Emitter for Summary {
///     fn emit(&self, plan: &WorkflowPlan) -> EmitterResult<String> {
///         Ok(format!("{}: {} jobs", plan.name, plan.jobs.len()))
///     }
///
///     fn format_name(&self) -> &'static str {
///         "summary"
///     }
///
///     fn file_extension(&self) -> &'static str {
///         "txt"
///     }
/// }
/// ```
pub trait Emitter: Send + Sync {
    /// Emit a workflow file from the plan
    ///
    /// # Errors
    /// Returns `EmitterError` if the plan cannot be rendered or serialized
    fn emit(&self, plan: &WorkflowPlan) -> EmitterResult<String>;

    /// Format identifier, e.g. "github"
    fn format_name(&self) -> &'static str;

    /// File extension of generated files, without the dot
    fn file_extension(&self) -> &'static str;

    /// Get a human-readable description of this emitter
    fn description(&self) -> &'static str {
        "Workflow emitter"
    }

    /// Emitter-specific validation, run before [`Emitter::emit`]
    ///
    /// # Errors
    /// Returns `EmitterError::InvalidPlan` if validation fails
    fn validate(&self, plan: &WorkflowPlan) -> EmitterResult<()> {
        let _ = plan;
        Ok(())
    }
}
