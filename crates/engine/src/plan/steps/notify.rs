//! Notification steps of the `notify` job.
//!
//! Each channel reports the result of the build job, read through a
//! [`Fragment::JobResult`] so the steps still run and report after a failed
//! build.

use super::{JobContext, JobRole, StepContributor, StepPhase};
use crate::config::{BuildOptions, Notification};
use crate::plan::{Binding, Condition, Fragment, StepPlan, build_job_id};
use crate::secrets::{
    EMAIL_RECIPIENTS, SLACK_WEBHOOK_URL, SMTP_PASSWORD, SMTP_SERVER, SMTP_USERNAME,
};

fn notifies<'a>(ctx: &JobContext<'a>, channel: Notification) -> Option<&'a BuildOptions> {
    ctx.build()
        .filter(|b| ctx.role == JobRole::Notify && b.notification.contains(&channel))
}

fn build_title(build: &BuildOptions) -> String {
    format!("{} {} build", build.platform.display_name(), build.variant.title())
}

/// Comments the build result on the triggering pull request.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrCommentContributor;

impl StepContributor for PrCommentContributor {
    fn id(&self) -> &'static str {
        "pr-comment"
    }

    fn phase(&self) -> StepPhase {
        StepPhase::Notify
    }

    fn priority(&self) -> u8 {
        0
    }

    fn is_active(&self, ctx: &JobContext<'_>) -> bool {
        notifies(ctx, Notification::PrComment).is_some()
    }

    fn contribute(&self, ctx: &JobContext<'_>) -> Vec<StepPlan> {
        let Some(build) = notifies(ctx, Notification::PrComment) else {
            return Vec::new();
        };
        let script = Binding::text(vec![
            Fragment::literal("const result = '"),
            Fragment::JobResult(build_job_id(build)),
            Fragment::literal(format!(
                "';\n\
                 const runUrl = `${{context.serverUrl}}/${{context.repo.owner}}/${{context.repo.repo}}/actions/runs/${{context.runId}}`;\n\
                 await github.rest.issues.createComment({{\n  \
                 issue_number: context.issue.number,\n  \
                 owner: context.repo.owner,\n  \
                 repo: context.repo.repo,\n  \
                 body: `{}: ${{result}}\\n\\n${{runUrl}}`,\n\
                 }});\n",
                build_title(build)
            )),
        ]);
        vec![
            StepPlan::uses("Comment on pull request", "actions/github-script@v7")
                .with_input("script", script)
                .with_condition(Condition::PullRequest),
        ]
    }
}

/// Posts the build result to a Slack incoming webhook.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlackContributor;

impl StepContributor for SlackContributor {
    fn id(&self) -> &'static str {
        "slack"
    }

    fn phase(&self) -> StepPhase {
        StepPhase::Notify
    }

    fn priority(&self) -> u8 {
        10
    }

    fn is_active(&self, ctx: &JobContext<'_>) -> bool {
        notifies(ctx, Notification::Slack).is_some()
    }

    fn contribute(&self, ctx: &JobContext<'_>) -> Vec<StepPlan> {
        let Some(build) = notifies(ctx, Notification::Slack) else {
            return Vec::new();
        };
        let script = format!(
            "curl -sS -X POST -H 'Content-type: application/json' \
             --data \"{{\\\"text\\\":\\\"{}: $BUILD_RESULT $RUN_URL\\\"}}\" \
             \"$SLACK_WEBHOOK_URL\"",
            build_title(build)
        );
        vec![
            StepPlan::run("Notify Slack", script)
                .with_secret_env(SLACK_WEBHOOK_URL)
                .with_env("BUILD_RESULT", Fragment::JobResult(build_job_id(build)))
                .with_env("RUN_URL", Fragment::RunUrl),
        ]
    }
}

/// Sends the build result by email over SMTP.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailContributor;

impl StepContributor for EmailContributor {
    fn id(&self) -> &'static str {
        "email"
    }

    fn phase(&self) -> StepPhase {
        StepPhase::Notify
    }

    fn priority(&self) -> u8 {
        20
    }

    fn is_active(&self, ctx: &JobContext<'_>) -> bool {
        notifies(ctx, Notification::Email).is_some()
    }

    fn contribute(&self, ctx: &JobContext<'_>) -> Vec<StepPlan> {
        let Some(build) = notifies(ctx, Notification::Email) else {
            return Vec::new();
        };
        let job = build_job_id(build);
        let title = build_title(build);
        vec![
            StepPlan::uses("Send email", "dawidd6/action-send-mail@v3")
                .with_input("server_address", Binding::secret(SMTP_SERVER))
                .with_input("server_port", 465_i64)
                .with_input("secure", true)
                .with_input("username", Binding::secret(SMTP_USERNAME))
                .with_input("password", Binding::secret(SMTP_PASSWORD))
                .with_input(
                    "subject",
                    Binding::text(vec![
                        Fragment::literal(format!("{title}: ")),
                        Fragment::JobResult(job.clone()),
                    ]),
                )
                .with_input("to", Binding::secret(EMAIL_RECIPIENTS))
                .with_input("from", Binding::secret(SMTP_USERNAME))
                .with_input(
                    "body",
                    Binding::text(vec![
                        Fragment::literal(format!("{title} finished with result ")),
                        Fragment::JobResult(job),
                        Fragment::literal(".\n\n"),
                        Fragment::RunUrl,
                    ]),
                ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{WorkflowConfig, validate};
    use serde_json::json;

    fn build(notification: serde_json::Value) -> WorkflowConfig {
        validate(&json!({
            "kind": "build",
            "options": {
                "triggers": { "branches": ["main"] },
                "build": { "platform": "android", "notification": notification }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_only_in_notify_job() {
        let config = build(json!(["slack"]));
        assert!(!SlackContributor.is_active(&JobContext::primary(&config)));
        assert!(SlackContributor.is_active(&JobContext::notify(&config)));
        assert!(!EmailContributor.is_active(&JobContext::notify(&config)));
    }

    #[test]
    fn test_selected_build_outlives_job_context() {
        let config = build(json!(["email", "slack"]));
        let selected = {
            let ctx = JobContext::notify(&config);
            notifies(&ctx, Notification::Email)
        };
        assert_eq!(selected, config.options.build.as_ref());
        assert!(notifies(&JobContext::primary(&config), Notification::Email).is_none());
        assert!(notifies(&JobContext::notify(&config), Notification::PrComment).is_none());
    }

    #[test]
    fn test_pr_comment_reads_build_result() {
        let config = build(json!("pr-comment"));
        let steps = PrCommentContributor.contribute(&JobContext::notify(&config));
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].condition, Some(Condition::PullRequest));
        let fragments = steps[0].with["script"].fragments();
        assert!(fragments.contains(&Fragment::JobResult("android-release".into())));
        let Fragment::Literal(body) = &fragments[2] else {
            panic!("expected literal script body");
        };
        assert!(body.contains("${context.runId}"));
        assert!(body.contains("Android Release build: ${result}"));
    }

    #[test]
    fn test_slack_env() {
        let config = build(json!("slack"));
        let steps = SlackContributor.contribute(&JobContext::notify(&config));
        let env = &steps[0].env;
        assert_eq!(env[SLACK_WEBHOOK_URL], Binding::secret(SLACK_WEBHOOK_URL));
        assert_eq!(env["RUN_URL"], Binding::from(Fragment::RunUrl));
        assert!(steps[0].action.as_str().contains("$SLACK_WEBHOOK_URL"));
    }

    #[test]
    fn test_email_inputs() {
        let config = build(json!("email"));
        let steps = EmailContributor.contribute(&JobContext::notify(&config));
        let with = &steps[0].with;
        assert_eq!(with["server_port"], Binding::Integer(465));
        assert_eq!(with["secure"], Binding::Bool(true));
        assert_eq!(with["to"], Binding::secret(EMAIL_RECIPIENTS));
        assert!(with["body"].fragments().contains(&Fragment::RunUrl));
    }
}
