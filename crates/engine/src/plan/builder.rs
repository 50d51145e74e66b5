//! Configuration to plan compilation.

use super::steps::{JobContext, StepContributor, default_contributors};
use super::{Condition, EventTrigger, JobPlan, Permission, RunnerKind, WorkflowPlan};
use crate::config::{BuildOptions, Kind, Notification, Platform, WorkflowConfig};
use crate::secrets::detect_secrets;

const NOTIFY_JOB_ID: &str = "notify";

/// Id of the build job for `build`, e.g. `android-release`.
#[must_use]
pub fn build_job_id(build: &BuildOptions) -> String {
    format!("{}-{}", build.platform, build.variant)
}

/// Compile `config` into a plan with the default contributor set.
#[must_use]
pub fn build_plan(config: &WorkflowConfig) -> WorkflowPlan {
    PlanBuilder::new().build(config)
}

/// Compiles configurations into plans from a set of step contributors.
pub struct PlanBuilder {
    contributors: Vec<Box<dyn StepContributor>>,
}

impl Default for PlanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PlanBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanBuilder")
            .field(
                "contributors",
                &self.contributors.iter().map(|c| c.id()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl PlanBuilder {
    /// Builder with the default contributors.
    #[must_use]
    pub fn new() -> Self {
        Self::with_contributors(default_contributors())
    }

    /// Builder with a custom contributor set.
    #[must_use]
    pub fn with_contributors(contributors: Vec<Box<dyn StepContributor>>) -> Self {
        Self { contributors }
    }

    /// Compile `config` into a plan.
    #[must_use]
    pub fn build(&self, config: &WorkflowConfig) -> WorkflowPlan {
        let mut jobs = vec![self.primary_job(config)];
        if let Some(notify) = self.notify_job(config) {
            jobs.push(notify);
        }

        let plan = WorkflowPlan {
            name: config.workflow_name(),
            triggers: triggers(config),
            permissions: permissions(config),
            jobs,
            secrets: detect_secrets(config),
        };

        tracing::debug!(
            workflow = %plan.name,
            jobs = ?plan.jobs.iter().map(|j| j.id.as_str()).collect::<Vec<_>>(),
            "jobs planned"
        );
        plan
    }

    fn primary_job(&self, config: &WorkflowConfig) -> JobPlan {
        let ctx = JobContext::primary(config);
        let (steps, notes) = self.assemble(&ctx);

        let (id, name, runner, environment, timeout) = match ctx.build() {
            Some(build) => (
                build_job_id(build),
                format!(
                    "Build {} {}",
                    build.platform.display_name(),
                    build.variant.title()
                ),
                RunnerKind::for_platform(build.platform),
                build.environment.clone(),
                match build.platform {
                    Platform::Android => 60,
                    Platform::Ios => 90,
                },
            ),
            None => (
                kind_job_id(config.kind).to_string(),
                config.kind.display_name().to_string(),
                RunnerKind::Linux,
                None,
                20,
            ),
        };

        JobPlan {
            id,
            name,
            runner,
            needs: Vec::new(),
            condition: None,
            environment,
            timeout_minutes: Some(timeout),
            steps,
            notes,
        }
    }

    fn notify_job(&self, config: &WorkflowConfig) -> Option<JobPlan> {
        let ctx = JobContext::notify(config);
        let build = ctx.build().filter(|b| !b.notification.is_empty())?;
        let (steps, notes) = self.assemble(&ctx);

        Some(JobPlan {
            id: NOTIFY_JOB_ID.to_string(),
            name: "Notify".to_string(),
            runner: RunnerKind::Linux,
            needs: vec![build_job_id(build)],
            condition: Some(Condition::Always),
            environment: None,
            timeout_minutes: Some(10),
            steps,
            notes,
        })
    }

    /// Collect the steps of every active contributor in `(phase, priority)`
    /// order. The sort is stable, so contributor order breaks ties.
    fn assemble(&self, ctx: &JobContext<'_>) -> (Vec<super::StepPlan>, Vec<String>) {
        let mut staged = Vec::new();
        let mut notes = Vec::new();
        for contributor in self.contributors.iter().filter(|c| c.is_active(ctx)) {
            let key = (contributor.phase(), contributor.priority());
            staged.extend(contributor.contribute(ctx).into_iter().map(|s| (key, s)));
            notes.extend(contributor.notes(ctx));
        }
        staged.sort_by_key(|(key, _)| *key);
        (staged.into_iter().map(|(_, step)| step).collect(), notes)
    }
}

const fn kind_job_id(kind: Kind) -> &'static str {
    match kind {
        Kind::Build => "build",
        Kind::Test => "test",
        Kind::Lint => "lint",
        Kind::StaticAnalysis => "static-analysis",
    }
}

fn triggers(config: &WorkflowConfig) -> Vec<EventTrigger> {
    let branches = &config.options.triggers.branches;
    config
        .options
        .triggers
        .events
        .iter()
        .map(|&event| EventTrigger {
            event,
            branches: if event.filters_branches() {
                branches.clone()
            } else {
                Vec::new()
            },
        })
        .collect()
}

fn permissions(config: &WorkflowConfig) -> Vec<Permission> {
    let comments = config
        .options
        .build
        .as_ref()
        .is_some_and(|b| {
            config.kind == Kind::Build && b.notification.contains(&Notification::PrComment)
        });
    if comments {
        vec![Permission::ContentsRead, Permission::PullRequestsWrite]
    } else {
        vec![Permission::ContentsRead]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Event, validate};
    use crate::plan::StepPlan;
    use crate::plan::steps::StepPhase;
    use serde_json::json;

    fn config(doc: serde_json::Value) -> WorkflowConfig {
        validate(&doc).unwrap()
    }

    fn step_names(job: &JobPlan) -> Vec<&str> {
        job.steps.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_android_release_with_notifications() {
        let plan = build_plan(&config(json!({
            "kind": "build",
            "options": {
                "triggers": { "branches": ["main"], "events": ["push", "pull_request"] },
                "build": {
                    "platform": "android",
                    "variant": "release",
                    "storage": "github",
                    "notification": ["pr-comment", "slack"]
                }
            }
        })));

        assert_eq!(plan.name, "Android Release Build");
        assert_eq!(plan.jobs.len(), 2);

        let build = &plan.jobs[0];
        assert_eq!(build.id, "android-release");
        assert_eq!(build.runner, RunnerKind::Linux);
        assert_eq!(
            step_names(build),
            vec![
                "Checkout",
                "Setup Node.js",
                "Setup Java",
                "Install dependencies",
                "Build Android Release",
                "Upload artifact",
            ]
        );

        let notify = &plan.jobs[1];
        assert_eq!(notify.id, "notify");
        assert_eq!(notify.needs, vec!["android-release"]);
        assert_eq!(notify.condition, Some(Condition::Always));
        assert_eq!(
            step_names(notify),
            vec!["Comment on pull request", "Notify Slack"]
        );

        assert_eq!(
            plan.permissions,
            vec![Permission::ContentsRead, Permission::PullRequestsWrite]
        );
    }

    #[test]
    fn test_empty_notification_omits_notify_job() {
        let plan = build_plan(&config(json!({
            "kind": "build",
            "options": {
                "triggers": { "branches": ["main"] },
                "build": { "platform": "ios", "storage": "testflight" }
            }
        })));
        assert_eq!(plan.jobs.len(), 1);
        assert_eq!(plan.jobs[0].runner, RunnerKind::MacOs);
        assert_eq!(plan.permissions, vec![Permission::ContentsRead]);
        assert_eq!(
            step_names(&plan.jobs[0]),
            vec![
                "Checkout",
                "Setup Node.js",
                "Install dependencies",
                "Install CocoaPods",
                "Install signing certificate",
                "Archive iOS Release",
                "Export IPA",
                "Remove signing keychain",
                "Upload to TestFlight",
            ]
        );
    }

    #[test]
    fn test_kind_jobs() {
        for (kind, id) in [
            ("test", "test"),
            ("lint", "lint"),
            ("static-analysis", "static-analysis"),
        ] {
            let plan = build_plan(&config(json!({
                "kind": kind,
                "options": { "triggers": { "branches": ["main"] } }
            })));
            assert_eq!(plan.jobs.len(), 1, "{kind}");
            assert_eq!(plan.jobs[0].id, id);
            assert!(plan.secrets.is_empty());
        }
    }

    #[test]
    fn test_pnpm_setup_precedes_node() {
        let plan = build_plan(&config(json!({
            "kind": "lint",
            "options": { "triggers": { "branches": ["main"] }, "packageManager": "pnpm" }
        })));
        assert_eq!(
            step_names(&plan.jobs[0]),
            vec!["Checkout", "Setup pnpm", "Setup Node.js", "Install dependencies", "Lint"]
        );
    }

    #[test]
    fn test_triggers_carry_branches_only_where_supported() {
        let plan = build_plan(&config(json!({
            "kind": "lint",
            "options": {
                "triggers": {
                    "branches": ["release/*", "main"],
                    "events": ["workflow_dispatch", "push"]
                }
            }
        })));
        assert_eq!(
            plan.triggers,
            vec![
                EventTrigger {
                    event: Event::Push,
                    branches: vec!["release/*".into(), "main".into()],
                },
                EventTrigger {
                    event: Event::WorkflowDispatch,
                    branches: vec![],
                },
            ]
        );
    }

    #[test]
    fn test_degraded_combination_note() {
        let plan = build_plan(&config(json!({
            "kind": "build",
            "options": {
                "triggers": { "branches": ["main"] },
                "build": { "platform": "android", "storage": "testflight" }
            }
        })));
        let job = &plan.jobs[0];
        assert_eq!(job.notes.len(), 1);
        assert_eq!(job.steps.last().unwrap().name, "Build Android Release");
    }

    #[test]
    fn test_environment_applies_to_build_job_only() {
        let plan = build_plan(&config(json!({
            "kind": "build",
            "options": {
                "triggers": { "branches": ["main"] },
                "build": {
                    "platform": "android",
                    "environment": "production",
                    "notification": "email"
                }
            }
        })));
        assert_eq!(plan.jobs[0].environment.as_deref(), Some("production"));
        assert_eq!(plan.jobs[1].environment, None);
    }

    struct Late;

    impl StepContributor for Late {
        fn id(&self) -> &'static str {
            "late"
        }
        fn phase(&self) -> StepPhase {
            StepPhase::Checkout
        }
        fn is_active(&self, _: &JobContext<'_>) -> bool {
            true
        }
        fn contribute(&self, _: &JobContext<'_>) -> Vec<StepPlan> {
            vec![StepPlan::run("Early", "true")]
        }
    }

    #[test]
    fn test_phase_wins_over_contributor_order() {
        let mut contributors = default_contributors();
        contributors.push(Box::new(Late));
        let plan = PlanBuilder::with_contributors(contributors).build(&config(json!({
            "kind": "lint",
            "options": { "triggers": { "branches": ["main"] } }
        })));
        // the notify job is absent, so "Early" only lands in the primary job
        assert_eq!(&step_names(&plan.jobs[0])[..2], &["Checkout", "Early"]);
    }
}
