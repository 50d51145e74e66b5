//! Workflow generation engine for rnflow.
//!
//! Compiles a declarative configuration document into a CI workflow plan and,
//! through an [`Emitter`], into a workflow file. The pipeline is:
//!
//! 1. [`validate`] a raw document into a typed [`WorkflowConfig`], or resolve a
//!    named preset with [`resolve_preset`] and merge user overrides onto it
//! 2. [`detect_secrets`] required by the resolved configuration
//! 3. [`build_plan`] into the [`WorkflowPlan`] intermediate representation
//! 4. emit the plan with an [`Emitter`] implementation (e.g. the GitHub Actions
//!    emitter in `rnflow-github`)
//!
//! [`Generator`] wires the stages together. The engine is synchronous and
//! performs no I/O; reading config files and writing workflows belongs to the
//! caller.
//!
//! # Example
//!
//! ```ignore
//! use rnflow_engine::{Generator, PresetRegistry};
//! use rnflow_github::GitHubActionsEmitter;
//!
//! let emitter = GitHubActionsEmitter::new();
//! let generated = Generator::new(PresetRegistry::builtin(), &emitter).generate(&raw)?;
//! std::fs::write(generated.file_name, generated.workflow)?;
//! ```

pub mod config;
pub mod emitter;
mod error;
pub mod generate;
pub mod plan;
pub mod presets;
pub mod secrets;

pub use config::{
    BuildOptions, Event, Kind, Notification, Options, PackageManager, Platform, Storage, Triggers,
    ValidationError, ValidationErrors, Variant, WorkflowConfig, validate,
};
pub use emitter::{Emitter, EmitterError, EmitterResult};
pub use error::{Error, Result};
pub use generate::{Generated, Generator};
pub use plan::{PlanDefect, PlanValidator, WorkflowPlan, build_plan};
pub use presets::{Preset, PresetError, PresetRegistry, resolve_preset};
pub use secrets::{SecretRequirement, SecretScope, detect_secrets};
