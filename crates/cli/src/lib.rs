//! rnflow command-line interface
//!
//! Reads a workflow configuration (or a preset plus overrides), runs the
//! generation pipeline and writes a GitHub Actions workflow.

pub mod cli;
mod run;
pub mod tracing;

pub use run::{load_document, run};
