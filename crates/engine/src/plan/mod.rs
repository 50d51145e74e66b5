//! Workflow plan intermediate representation
//!
//! The plan is the CI-platform-agnostic form of a workflow: triggers, jobs and
//! steps with every value already resolved. Values that only the CI platform
//! can supply at run time (secrets, upstream job results, the run URL) are
//! kept symbolic as [`Fragment`]s so each emitter can render them in its own
//! expression syntax.
//!
//! Plans are built by [`build_plan`] and checked by [`PlanValidator`] before
//! emission.

mod builder;
pub mod steps;
mod validation;

pub use builder::{PlanBuilder, build_job_id, build_plan};
pub use validation::{PlanDefect, PlanValidator};

use crate::config::{Event, Platform};
use crate::secrets::SecretRequirement;
use indexmap::IndexMap;
use std::collections::BTreeSet;

/// Root plan document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowPlan {
    /// Workflow display name
    pub name: String,
    /// Trigger events in canonical order
    pub triggers: Vec<EventTrigger>,
    /// Token permissions granted to the workflow
    pub permissions: Vec<Permission>,
    /// Jobs in execution order; a job only depends on earlier jobs
    pub jobs: Vec<JobPlan>,
    /// Secrets the workflow references, for annotation
    pub secrets: Vec<SecretRequirement>,
}

impl WorkflowPlan {
    /// Find a job by id.
    #[must_use]
    pub fn job(&self, id: &str) -> Option<&JobPlan> {
        self.jobs.iter().find(|j| j.id == id)
    }

    /// Names of every secret referenced by a step binding.
    #[must_use]
    pub fn secret_references(&self) -> BTreeSet<&str> {
        self.jobs
            .iter()
            .flat_map(|job| &job.steps)
            .flat_map(|step| step.with.values().chain(step.env.values()))
            .flat_map(Binding::fragments)
            .filter_map(|fragment| match fragment {
                Fragment::Secret(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Notes of every job, paired with the job id.
    pub fn notes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.jobs
            .iter()
            .flat_map(|job| job.notes.iter().map(|n| (job.id.as_str(), n.as_str())))
    }
}

/// An event the workflow reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTrigger {
    /// Triggering event
    pub event: Event,
    /// Branch filter; empty for events that do not filter by branch
    pub branches: Vec<String>,
}

/// Token permission granted to the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Permission {
    /// Read repository contents
    ContentsRead,
    /// Comment on pull requests
    PullRequestsWrite,
}

/// Class of machine a job runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunnerKind {
    /// Linux runner
    Linux,
    /// macOS runner (required for Xcode)
    MacOs,
}

impl RunnerKind {
    /// Runner needed to build `platform`.
    #[must_use]
    pub const fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Android => Self::Linux,
            Platform::Ios => Self::MacOs,
        }
    }
}

/// Run condition for a job or step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Run even when earlier jobs or steps failed
    Always,
    /// Run only for pull request events
    PullRequest,
}

/// A job in the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPlan {
    /// Job id, unique within the plan
    pub id: String,
    /// Display name
    pub name: String,
    /// Runner class
    pub runner: RunnerKind,
    /// Ids of jobs that must finish first
    pub needs: Vec<String>,
    /// Job-level run condition
    pub condition: Option<Condition>,
    /// Deployment environment
    pub environment: Option<String>,
    /// Timeout in minutes
    pub timeout_minutes: Option<u32>,
    /// Steps in execution order
    pub steps: Vec<StepPlan>,
    /// Notes about degraded or omitted behavior, emitted as comments
    pub notes: Vec<String>,
}

/// A single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPlan {
    /// Display name
    pub name: String,
    /// Step id for output references
    pub id: Option<String>,
    /// What the step executes
    pub action: StepAction,
    /// Run condition
    pub condition: Option<Condition>,
    /// Working directory for `run` steps
    pub working_directory: Option<String>,
    /// Action inputs
    pub with: IndexMap<String, Binding>,
    /// Environment variables
    pub env: IndexMap<String, Binding>,
}

/// What a step executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// A published action reference, e.g. `actions/checkout@v4`
    Uses(String),
    /// A shell script
    Run(String),
}

impl StepAction {
    /// The action reference or script.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Uses(s) | Self::Run(s) => s,
        }
    }
}

impl StepPlan {
    /// Create a step that uses an action.
    #[must_use]
    pub fn uses(name: impl Into<String>, action: impl Into<String>) -> Self {
        Self::new(name, StepAction::Uses(action.into()))
    }

    /// Create a step that runs a shell script.
    #[must_use]
    pub fn run(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self::new(name, StepAction::Run(script.into()))
    }

    fn new(name: impl Into<String>, action: StepAction) -> Self {
        Self {
            name: name.into(),
            id: None,
            action,
            condition: None,
            working_directory: None,
            with: IndexMap::new(),
            env: IndexMap::new(),
        }
    }

    /// Set the step id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add an action input.
    #[must_use]
    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<Binding>) -> Self {
        self.with.insert(key.into(), value.into());
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<Binding>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Expose a secret as an environment variable of the same name.
    #[must_use]
    pub fn with_secret_env(self, name: &str) -> Self {
        self.with_env(name, Binding::secret(name))
    }

    /// Set the run condition.
    #[must_use]
    pub const fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn with_working_directory(mut self, dir: impl Into<String>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }
}

/// A value bound to an action input or environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// Boolean literal
    Bool(bool),
    /// Integer literal
    Integer(i64),
    /// Text assembled from literal and run-time fragments
    Text(Vec<Fragment>),
}

/// Part of a text binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Literal text
    Literal(String),
    /// Value of a repository or environment secret
    Secret(String),
    /// Result of an upstream job (`success`, `failure`, ...)
    JobResult(String),
    /// URL of the current workflow run
    RunUrl,
}

impl Binding {
    /// A literal text value.
    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Text(vec![Fragment::Literal(value.into())])
    }

    /// A secret reference.
    #[must_use]
    pub fn secret(name: impl Into<String>) -> Self {
        Self::Text(vec![Fragment::Secret(name.into())])
    }

    /// Text built from fragments.
    #[must_use]
    pub const fn text(fragments: Vec<Fragment>) -> Self {
        Self::Text(fragments)
    }

    /// The text fragments of this binding; empty for scalars.
    #[must_use]
    pub fn fragments(&self) -> &[Fragment] {
        match self {
            Self::Text(fragments) => fragments,
            Self::Bool(_) | Self::Integer(_) => &[],
        }
    }
}

impl From<&str> for Binding {
    fn from(value: &str) -> Self {
        Self::literal(value)
    }
}

impl From<String> for Binding {
    fn from(value: String) -> Self {
        Self::literal(value)
    }
}

impl From<bool> for Binding {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Binding {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<Fragment> for Binding {
    fn from(fragment: Fragment) -> Self {
        Self::Text(vec![fragment])
    }
}

impl Fragment {
    /// A literal fragment.
    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }
}
