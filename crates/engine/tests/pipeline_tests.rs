//! End-to-end tests of the generation pipeline with a minimal emitter

use rnflow_engine::plan::{Binding, Condition, Fragment, StepAction};
use rnflow_engine::{
    Emitter, EmitterError, EmitterResult, Error, Generator, PresetRegistry, WorkflowPlan,
};
use serde_json::json;

/// Emits one line per step: `job/step: action`.
struct Outline;

impl Emitter for Outline {
    fn emit(&self, plan: &WorkflowPlan) -> EmitterResult<String> {
        let mut out = String::new();
        for job in &plan.jobs {
            for step in &job.steps {
                out.push_str(&format!("{}/{}: {}\n", job.id, step.name, step.action.as_str()));
            }
        }
        Ok(out)
    }

    fn format_name(&self) -> &'static str {
        "outline"
    }

    fn file_extension(&self) -> &'static str {
        "txt"
    }
}

/// Rejects any plan with more than one job.
struct SingleJobOnly;

impl Emitter for SingleJobOnly {
    fn emit(&self, _plan: &WorkflowPlan) -> EmitterResult<String> {
        Ok(String::new())
    }

    fn format_name(&self) -> &'static str {
        "single"
    }

    fn file_extension(&self) -> &'static str {
        "yml"
    }

    fn validate(&self, plan: &WorkflowPlan) -> EmitterResult<()> {
        if plan.jobs.len() > 1 {
            return Err(EmitterError::UnsupportedFeature {
                feature: "job dependencies".into(),
                emitter: "single",
            });
        }
        Ok(())
    }
}

#[test]
fn every_builtin_preset_generates() {
    let generator = Generator::new(PresetRegistry::builtin(), &Outline);
    for preset in PresetRegistry::builtin().list() {
        let generated = generator
            .generate(&json!({ "preset": preset.slug }))
            .unwrap_or_else(|e| panic!("{}: {e}", preset.slug));
        assert!(!generated.workflow.is_empty(), "{}", preset.slug);
        assert!(generated.file_name.ends_with(".txt"));
    }
}

#[test]
fn ios_testflight_with_email_scenario() {
    let generated = Generator::new(PresetRegistry::builtin(), &Outline)
        .generate(&json!({
            "name": "iOS Beta",
            "kind": "build",
            "options": {
                "triggers": { "branches": ["main"], "events": ["push"] },
                "build": {
                    "platform": "ios",
                    "storage": "testflight",
                    "notification": ["email"],
                    "environment": "beta"
                },
                "packageManager": "yarn"
            }
        }))
        .unwrap();

    assert_eq!(generated.file_name, "ios-beta.txt");
    assert!(generated
        .workflow
        .contains("ios-release/Install dependencies: yarn install --frozen-lockfile\n"));
    assert!(generated.workflow.contains("notify/Send email: dawidd6/action-send-mail@v3\n"));

    let notify = generated.plan.job("notify").unwrap();
    assert_eq!(notify.condition, Some(Condition::Always));
    let body = &notify.steps[0].with["body"];
    assert!(body
        .fragments()
        .contains(&Fragment::JobResult("ios-release".into())));

    let names: Vec<_> = generated.secrets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "IOS_CERTIFICATE_P12_BASE64",
            "IOS_CERTIFICATE_PASSWORD",
            "IOS_PROVISIONING_PROFILE_BASE64",
            "IOS_KEYCHAIN_PASSWORD",
            "APP_STORE_CONNECT_API_KEY_ID",
            "APP_STORE_CONNECT_ISSUER_ID",
            "APP_STORE_CONNECT_API_KEY_BASE64",
            "SMTP_SERVER",
            "SMTP_USERNAME",
            "SMTP_PASSWORD",
            "EMAIL_RECIPIENTS",
        ]
    );
}

#[test]
fn preset_with_overrides_keeps_unrelated_fields() {
    let generated = Generator::new(PresetRegistry::builtin(), &Outline)
        .generate(&json!({
            "preset": "react-native-android-debug",
            "options": { "build": { "notification": [] } }
        }))
        .unwrap();
    let build = generated.config.options.build.unwrap();
    assert!(build.notification.is_empty());
    assert_eq!(generated.plan.jobs.len(), 1);
    assert!(generated.workflow.contains("assembleDebug"));
}

#[test]
fn unsupported_kind_reports_whole_batch() {
    let err = Generator::new(PresetRegistry::builtin(), &Outline)
        .generate(&json!({
            "kind": "deploy-to-moon",
            "options": {
                "triggers": { "branches": ["main"], "events": ["push", "nightly"] },
                "packageManager": "bun"
            }
        }))
        .unwrap_err();
    let Error::Validation(errors) = err else {
        panic!("expected validation errors");
    };
    assert_eq!(
        errors.paths(),
        vec!["kind", "options.triggers.events[1]", "options.packageManager"]
    );
}

#[test]
fn emitter_validation_stops_generation() {
    let generator = Generator::new(PresetRegistry::builtin(), &SingleJobOnly);
    assert!(generator.generate(&json!({ "preset": "react-native-lint" })).is_ok());

    let err = generator
        .generate(&json!({ "preset": "react-native-ios-release" }))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Emit(EmitterError::UnsupportedFeature { .. })
    ));
    assert!(!err.is_user_error());
}

#[test]
fn slack_step_exposes_run_url() {
    let generated = Generator::new(PresetRegistry::builtin(), &Outline)
        .generate(&json!({ "preset": "react-native-ios-release" }))
        .unwrap();
    let slack = &generated.plan.job("notify").unwrap().steps[0];
    assert!(matches!(slack.action, StepAction::Run(_)));
    assert_eq!(slack.env["RUN_URL"], Binding::from(Fragment::RunUrl));
}
