//! End-to-end generation pipeline.

use crate::config::{ValidationErrors, WorkflowConfig, describe, validate};
use crate::emitter::Emitter;
use crate::error::{Error, Result};
use crate::plan::{PlanValidator, WorkflowPlan, build_plan};
use crate::presets::{PresetRegistry, slugify};
use crate::secrets::SecretRequirement;
use serde_json::Value;
use tracing::instrument;

/// Top-level document key selecting a preset.
pub const PRESET_KEY: &str = "preset";

/// A generated workflow.
#[derive(Debug, Clone)]
pub struct Generated {
    /// The resolved configuration
    pub config: WorkflowConfig,
    /// The plan the workflow was emitted from
    pub plan: WorkflowPlan,
    /// Workflow file contents
    pub workflow: String,
    /// Secrets the workflow references
    pub secrets: Vec<SecretRequirement>,
    /// Suggested file name, e.g. `android-release-build.yml`
    pub file_name: String,
}

/// Runs the generation pipeline against a preset registry and an emitter.
pub struct Generator<'a> {
    registry: &'a PresetRegistry,
    emitter: &'a dyn Emitter,
}

impl std::fmt::Debug for Generator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("presets", &self.registry.len())
            .field("emitter", &self.emitter.format_name())
            .finish()
    }
}

impl<'a> Generator<'a> {
    /// Create a generator.
    #[must_use]
    pub fn new(registry: &'a PresetRegistry, emitter: &'a dyn Emitter) -> Self {
        Self { registry, emitter }
    }

    /// Generate a workflow from a raw document.
    ///
    /// A top-level `preset` key selects a preset; the rest of the document is
    /// merged onto it as overrides.
    ///
    /// # Errors
    ///
    /// Returns every validation error of the document, a preset error, or an
    /// internal defect. Nothing is generated on error.
    pub fn generate(&self, raw: &Value) -> Result<Generated> {
        let config = self.resolve(raw)?;
        self.generate_config(&config)
    }

    /// Generate a workflow from `preset` with `overrides` merged on top.
    ///
    /// A `preset` key inside `overrides` is ignored.
    ///
    /// # Errors
    ///
    /// See [`Generator::generate`].
    pub fn generate_with_preset(&self, preset: &str, overrides: &Value) -> Result<Generated> {
        let config = self.resolve_with_preset(preset, &without_preset_key(overrides))?;
        self.generate_config(&config)
    }

    /// Resolve a raw document into a configuration without generating.
    ///
    /// # Errors
    ///
    /// Returns validation or preset errors.
    pub fn resolve(&self, raw: &Value) -> Result<WorkflowConfig> {
        match raw.get(PRESET_KEY) {
            None => Ok(validate(raw)?),
            Some(Value::Null) => Ok(validate(&without_preset_key(raw))?),
            Some(Value::String(name)) => {
                self.resolve_with_preset(name, &without_preset_key(raw))
            }
            Some(other) => Err(ValidationErrors::single(
                PRESET_KEY,
                format!("expected a preset name, found {}", describe(other)),
            )
            .into()),
        }
    }

    fn resolve_with_preset(&self, name: &str, overrides: &Value) -> Result<WorkflowConfig> {
        Ok(self.registry.resolve(name, overrides)?)
    }

    /// Plan, check and emit a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedCombination`] when the plan violates an
    /// invariant, or the emitter's error.
    #[instrument(skip_all, fields(kind = %config.kind, emitter = self.emitter.format_name()))]
    pub fn generate_config(&self, config: &WorkflowConfig) -> Result<Generated> {
        let plan = build_plan(config);

        PlanValidator::new(&plan)
            .validate()
            .map_err(|defects| Error::UnsupportedCombination {
                workflow: plan.name.clone(),
                defects,
            })?;
        self.emitter.validate(&plan)?;
        let workflow = self.emitter.emit(&plan)?;

        let file_name = file_name(&plan.name, self.emitter.file_extension());
        tracing::info!(
            workflow = %plan.name,
            file = %file_name,
            jobs = plan.jobs.len(),
            secrets = plan.secrets.len(),
            "workflow generated"
        );

        Ok(Generated {
            config: config.clone(),
            secrets: plan.secrets.clone(),
            plan,
            workflow,
            file_name,
        })
    }
}

fn without_preset_key(raw: &Value) -> Value {
    match raw {
        Value::Object(map) => {
            let mut overrides = map.clone();
            overrides.remove(PRESET_KEY);
            Value::Object(overrides)
        }
        other => other.clone(),
    }
}

fn file_name(workflow: &str, extension: &str) -> String {
    let slug = slugify(workflow);
    let stem = if slug.is_empty() { "workflow" } else { &slug };
    format!("{stem}.{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Kind;
    use crate::emitter::EmitterResult;
    use serde_json::json;

    struct JobList;

    impl Emitter for JobList {
        fn emit(&self, plan: &WorkflowPlan) -> EmitterResult<String> {
            Ok(plan
                .jobs
                .iter()
                .map(|j| j.id.as_str())
                .collect::<Vec<_>>()
                .join(","))
        }

        fn format_name(&self) -> &'static str {
            "jobs"
        }

        fn file_extension(&self) -> &'static str {
            "txt"
        }
    }

    fn generator() -> Generator<'static> {
        Generator::new(PresetRegistry::builtin(), &JobList)
    }

    #[test]
    fn test_generate_plain_document() {
        let generated = generator()
            .generate(&json!({
                "kind": "build",
                "options": {
                    "triggers": { "branches": ["main"] },
                    "build": { "platform": "ios", "notification": "slack" }
                }
            }))
            .unwrap();
        assert_eq!(generated.workflow, "ios-release,notify");
        assert_eq!(generated.file_name, "ios-release-build.txt");
        assert_eq!(generated.secrets.len(), 5);
    }

    #[test]
    fn test_generate_from_preset_key() {
        let generated = generator()
            .generate(&json!({ "preset": "React Native Lint", "name": "PR Lint" }))
            .unwrap();
        assert_eq!(generated.config.kind, Kind::Lint);
        assert_eq!(generated.file_name, "pr-lint.txt");
    }

    #[test]
    fn test_explicit_preset_ignores_document_key() {
        let generated = generator()
            .generate_with_preset("react-native-test", &json!({ "preset": "nope" }))
            .unwrap();
        assert_eq!(generated.config.kind, Kind::Test);
    }

    #[test]
    fn test_preset_key_must_be_string() {
        let err = generator().generate(&json!({ "preset": 3 })).unwrap_err();
        match err {
            Error::Validation(errors) => assert_eq!(errors.paths(), vec!["preset"]),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_preset() {
        let err = generator()
            .generate(&json!({ "preset": "react-native-web" }))
            .unwrap_err();
        assert!(err.is_user_error());
        assert!(matches!(err, Error::Preset(_)));
    }

    #[test]
    fn test_validation_errors_are_complete() {
        let err = generator()
            .generate(&json!({ "kind": "deploy", "options": { "triggers": { "branches": [] } } }))
            .unwrap_err();
        let Error::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.paths(), vec!["kind", "options.triggers.branches"]);
    }

    #[test]
    fn test_file_name_fallback() {
        assert_eq!(file_name("!!!", "yml"), "workflow.yml");
        assert_eq!(file_name("Static Analysis", "yml"), "static-analysis.yml");
    }
}
