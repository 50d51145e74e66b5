//! GitHub Actions Workflow Generator
//!
//! Renders rnflow workflow plans as GitHub Actions workflow files. The output
//! is meant to be committed to `.github/workflows/`.
//!
//! # Example
//!
//! ```ignore
//! use rnflow_engine::{Emitter, build_plan, validate};
//! use rnflow_engine::plan::RunnerKind;
//! use rnflow_github::workflow::GitHubActionsEmitter;
//!
//! let emitter = GitHubActionsEmitter::new()
//!     .with_runner(RunnerKind::MacOs, "macos-14")
//!     .without_concurrency();
//!
//! let yaml = emitter.emit(&build_plan(&validate(&raw)?))?;
//! std::fs::write(".github/workflows/android-release-build.yml", yaml)?;
//! ```

pub mod emitter;
pub mod schema;

pub use emitter::GitHubActionsEmitter;
pub use schema::*;
