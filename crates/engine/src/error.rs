use crate::config::ValidationErrors;
use crate::emitter::EmitterError;
use crate::plan::PlanDefect;
use crate::presets::PresetError;
use miette::Diagnostic;
use thiserror::Error;

/// Errors of the generation pipeline.
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    /// The configuration document is invalid
    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationErrors),

    /// Preset lookup or merge failed
    #[error(transparent)]
    #[diagnostic(transparent)]
    Preset(#[from] PresetError),

    /// The emitter rejected or failed to render the plan
    #[error(transparent)]
    #[diagnostic(transparent)]
    Emit(#[from] EmitterError),

    /// The plan for a validated configuration violates plan invariants
    #[error("cannot generate workflow '{workflow}': unsupported option combination")]
    #[diagnostic(
        code(rnflow::plan::unsupported_combination),
        help("this is a bug in rnflow; please report it with the configuration that triggered it")
    )]
    UnsupportedCombination {
        /// Workflow name
        workflow: String,
        /// Every violated invariant
        #[related]
        defects: Vec<PlanDefect>,
    },
}

impl Error {
    /// Whether the error was caused by the input document rather than a
    /// defect in the engine.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Preset(_))
    }
}

/// Result type of the generation pipeline
pub type Result<T> = std::result::Result<T, Error>;
