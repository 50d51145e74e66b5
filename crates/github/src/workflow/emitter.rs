//! GitHub Actions Workflow Emitter
//!
//! Transforms an rnflow [`WorkflowPlan`] into GitHub Actions workflow YAML.

use crate::workflow::schema::{
    BranchFilter, Concurrency, Job, PermissionLevel, Permissions, Step, Workflow,
    WorkflowDispatchTrigger, WorkflowTriggers,
};
use rnflow_engine::plan::{
    Binding, Condition, Fragment, JobPlan, Permission, RunnerKind, StepAction, StepPlan,
};
use rnflow_engine::secrets::SecretScope;
use rnflow_engine::{Emitter, EmitterError, EmitterResult, Event, WorkflowPlan};
use std::fmt::Write as _;

const BANNER: &str = "# Generated by rnflow - do not edit manually\n\
                      # Regenerate with: rnflow --config <config> --output <this file>\n";

const RUN_URL: &str =
    "${{ github.server_url }}/${{ github.repository }}/actions/runs/${{ github.run_id }}";

/// GitHub Actions workflow emitter
///
/// # Plan to GitHub Actions Mapping
///
/// | Plan | GitHub Actions |
/// |------|----------------|
/// | `name` | Workflow `name:` |
/// | `triggers` | `on.push` / `on.pull_request` / `on.workflow_dispatch` |
/// | `permissions` | `permissions:` |
/// | `job.id` | Job key |
/// | `job.runner` | `runs-on:` (configurable per runner class) |
/// | `job.needs` | `needs:` |
/// | `job.condition` / `step.condition` | `if:` |
/// | `Fragment::Secret` | `${{ secrets.NAME }}` |
/// | `Fragment::JobResult` | `${{ needs.<job>.result }}` |
/// | `Fragment::RunUrl` | run URL built from `github.*` context |
/// | `job.notes`, `secrets` | header comments |
#[derive(Debug, Clone)]
pub struct GitHubActionsEmitter {
    /// Runner label for Linux jobs
    pub linux_runner: String,
    /// Runner label for macOS jobs
    pub macos_runner: String,
    /// Emit a workflow-level `concurrency:` block
    pub concurrency: bool,
}

impl Default for GitHubActionsEmitter {
    fn default() -> Self {
        Self {
            linux_runner: "ubuntu-latest".to_string(),
            macos_runner: "macos-latest".to_string(),
            concurrency: true,
        }
    }
}

impl GitHubActionsEmitter {
    /// Create a new GitHub Actions emitter with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the runner label for a runner class
    #[must_use]
    pub fn with_runner(mut self, kind: RunnerKind, label: impl Into<String>) -> Self {
        match kind {
            RunnerKind::Linux => self.linux_runner = label.into(),
            RunnerKind::MacOs => self.macos_runner = label.into(),
        }
        self
    }

    /// Emit a concurrency block (the default)
    #[must_use]
    pub const fn with_concurrency(mut self) -> Self {
        self.concurrency = true;
        self
    }

    /// Omit the concurrency block
    #[must_use]
    pub const fn without_concurrency(mut self) -> Self {
        self.concurrency = false;
        self
    }

    /// Runner label for a runner class
    #[must_use]
    pub fn runner(&self, kind: RunnerKind) -> &str {
        match kind {
            RunnerKind::Linux => &self.linux_runner,
            RunnerKind::MacOs => &self.macos_runner,
        }
    }

    /// Build the workflow document from a plan
    #[must_use]
    pub fn build_workflow(&self, plan: &WorkflowPlan) -> Workflow {
        Workflow {
            name: plan.name.clone(),
            on: Self::build_triggers(plan),
            permissions: Some(Self::build_permissions(plan)),
            concurrency: self.concurrency.then(|| Concurrency {
                group: "${{ github.workflow }}-${{ github.head_ref || github.ref }}".to_string(),
                cancel_in_progress: Some(true),
            }),
            jobs: plan
                .jobs
                .iter()
                .map(|job| (job.id.clone(), self.build_job(job)))
                .collect(),
        }
    }

    fn build_triggers(plan: &WorkflowPlan) -> WorkflowTriggers {
        let mut triggers = WorkflowTriggers::default();
        for trigger in &plan.triggers {
            let filter = || BranchFilter {
                branches: trigger.branches.clone(),
            };
            match trigger.event {
                Event::Push => triggers.push = Some(filter()),
                Event::PullRequest => triggers.pull_request = Some(filter()),
                Event::WorkflowDispatch => {
                    triggers.workflow_dispatch = Some(WorkflowDispatchTrigger {});
                }
            }
        }
        triggers
    }

    fn build_permissions(plan: &WorkflowPlan) -> Permissions {
        let mut permissions = Permissions::default();
        for permission in &plan.permissions {
            match permission {
                Permission::ContentsRead => permissions.contents = Some(PermissionLevel::Read),
                Permission::PullRequestsWrite => {
                    permissions.pull_requests = Some(PermissionLevel::Write);
                }
            }
        }
        permissions
    }

    fn build_job(&self, job: &JobPlan) -> Job {
        Job {
            name: Some(job.name.clone()),
            runs_on: self.runner(job.runner).to_string(),
            needs: job.needs.clone(),
            if_condition: job.condition.map(render_condition),
            environment: job.environment.clone(),
            timeout_minutes: job.timeout_minutes,
            steps: job.steps.iter().map(build_step).collect(),
        }
    }

    /// Header comments: banner, required secrets and plan notes
    fn render_header(plan: &WorkflowPlan) -> String {
        let mut header = String::from(BANNER);
        header.push_str("#\n");
        if plan.secrets.is_empty() {
            header.push_str("# Required secrets: none\n");
        } else {
            header.push_str("# Required secrets:\n");
            for secret in &plan.secrets {
                let _ = write!(header, "#   {}: {}", secret.name, secret.reason);
                if let SecretScope::Environment(environment) = &secret.scope {
                    let _ = write!(header, " (environment: {environment})");
                }
                header.push('\n');
            }
        }
        for (job, note) in plan.notes() {
            let _ = writeln!(header, "#\n# NOTE({job}): {note}");
        }
        header.push('\n');
        header
    }

    /// Serialize a workflow to YAML with a generation header
    fn serialize_workflow(plan: &WorkflowPlan, workflow: &Workflow) -> EmitterResult<String> {
        let yaml = serde_yaml::to_string(workflow)
            .map_err(|e| EmitterError::Serialization(e.to_string()))?;
        Ok(format!("{}{yaml}", Self::render_header(plan)))
    }
}

fn build_step(step: &StepPlan) -> Step {
    let base = match &step.action {
        StepAction::Uses(action) => Step::uses(action),
        StepAction::Run(script) => Step::run(script),
    };
    let mut built = base.with_name(&step.name);
    if let Some(id) = &step.id {
        built = built.with_id(id);
    }
    if let Some(condition) = step.condition {
        built = built.with_if(render_condition(condition));
    }
    if let Some(dir) = &step.working_directory {
        built = built.with_working_directory(dir);
    }
    for (key, value) in &step.with {
        built = built.with_input(key, render_binding(value));
    }
    for (key, value) in &step.env {
        built = built.with_env(key, render_env(value));
    }
    built
}

fn render_condition(condition: Condition) -> String {
    match condition {
        Condition::Always => "always()".to_string(),
        Condition::PullRequest => "github.event_name == 'pull_request'".to_string(),
    }
}

/// Render text fragments, with run-time values as `${{ }}` expressions.
fn render_text(fragments: &[Fragment]) -> String {
    let mut text = String::new();
    for fragment in fragments {
        match fragment {
            Fragment::Literal(literal) => text.push_str(literal),
            Fragment::Secret(name) => {
                let _ = write!(text, "${{{{ secrets.{name} }}}}");
            }
            Fragment::JobResult(job) => {
                let _ = write!(text, "${{{{ needs.{job}.result }}}}");
            }
            Fragment::RunUrl => text.push_str(RUN_URL),
        }
    }
    text
}

fn render_binding(binding: &Binding) -> serde_yaml::Value {
    match binding {
        Binding::Bool(value) => serde_yaml::Value::Bool(*value),
        Binding::Integer(value) => serde_yaml::Value::Number((*value).into()),
        Binding::Text(fragments) => serde_yaml::Value::String(render_text(fragments)),
    }
}

/// Environment values are always strings in GitHub Actions.
fn render_env(binding: &Binding) -> String {
    match binding {
        Binding::Bool(value) => value.to_string(),
        Binding::Integer(value) => value.to_string(),
        Binding::Text(fragments) => render_text(fragments),
    }
}

impl Emitter for GitHubActionsEmitter {
    fn emit(&self, plan: &WorkflowPlan) -> EmitterResult<String> {
        let workflow = self.build_workflow(plan);
        let yaml = Self::serialize_workflow(plan, &workflow)?;
        tracing::debug!(
            workflow = %plan.name,
            bytes = yaml.len(),
            "github actions workflow rendered"
        );
        Ok(yaml)
    }

    fn format_name(&self) -> &'static str {
        "github"
    }

    fn file_extension(&self) -> &'static str {
        "yml"
    }

    fn description(&self) -> &'static str {
        "GitHub Actions workflow YAML emitter"
    }

    fn validate(&self, plan: &WorkflowPlan) -> EmitterResult<()> {
        for kind in [RunnerKind::Linux, RunnerKind::MacOs] {
            if self.runner(kind).trim().is_empty() {
                return Err(EmitterError::InvalidPlan(format!(
                    "empty runner label for {kind:?} jobs"
                )));
            }
        }

        for job in &plan.jobs {
            for step in &job.steps {
                match step.action {
                    StepAction::Run(_) if !step.with.is_empty() => {
                        return Err(EmitterError::InvalidPlan(format!(
                            "step '{}' in job '{}' is a run step but has action inputs",
                            step.name, job.id
                        )));
                    }
                    StepAction::Uses(_) if step.working_directory.is_some() => {
                        return Err(EmitterError::UnsupportedFeature {
                            feature: format!("working-directory on action step '{}'", step.name),
                            emitter: "github",
                        });
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }
}
