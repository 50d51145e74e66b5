//! Built-in configuration presets
//!
//! A preset is a named, immutable [`WorkflowConfig`]. Resolving a preset
//! merges user overrides onto the preset document and validates the result
//! exactly like a hand-written configuration.
//!
//! # Merge policy
//!
//! | Field | Policy |
//! |-------|--------|
//! | `name`, `kind` | override replaces |
//! | `options.nodeVersion`, `options.packageManager` | override replaces |
//! | `options.triggers.branches`, `options.triggers.events` | override list replaces the preset list wholesale |
//! | `options.build.*` | merged per field; each present leaf replaces the preset value |
//! | anything else | carried into the merged document, so validation reports it |
//!
//! A field is overridden only when it is present in the overrides; omitting a
//! field never clears the preset value. An explicit `null` counts as present
//! and resets the field to its default.

use crate::config::{
    BuildOptions, Event, Kind, Notification, Options, PackageManager, Platform, Storage, Triggers,
    ValidationErrors, Variant, WorkflowConfig, validate,
};
use miette::Diagnostic;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::LazyLock;
use thiserror::Error;

/// Errors returned by preset resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum PresetError {
    /// No preset is registered under the requested name
    #[error("preset '{name}' not found")]
    #[diagnostic(
        code(rnflow::preset::not_found),
        help("available presets: {available}")
    )]
    PresetNotFound {
        /// The requested name
        name: String,
        /// Comma-separated list of registered preset slugs
        available: String,
    },

    /// The preset merged with the overrides is not a valid configuration
    #[error("preset '{name}' with the given overrides is invalid")]
    #[diagnostic(code(rnflow::preset::invalid))]
    Invalid {
        /// Slug of the resolved preset
        name: String,
        /// Validation errors of the merged document
        #[source]
        #[diagnostic_source]
        errors: ValidationErrors,
    },
}

/// A named configuration template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
    /// Registry key, e.g. `react-native-static-analysis`
    pub slug: String,
    /// Display title, e.g. "React Native Static Analysis"
    pub title: String,
    /// One-line description for listings
    pub description: String,
    /// The complete configuration the preset resolves to
    pub config: WorkflowConfig,
}

impl Preset {
    /// Create a preset; the slug is derived from the title.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        config: WorkflowConfig,
    ) -> Self {
        let title = title.into();
        Self {
            slug: slugify(&title),
            title,
            description: description.into(),
            config,
        }
    }
}

/// Read-only preset lookup table.
///
/// Construct once and share by reference; nothing mutates a registry after
/// [`PresetRegistryBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct PresetRegistry {
    presets: HashMap<String, Preset>,
}

static BUILTIN: LazyLock<PresetRegistry> = LazyLock::new(|| {
    let registry = PresetRegistry::builder().with_builtins().build();
    tracing::debug!(count = registry.len(), "built-in preset registry initialized");
    registry
});

impl PresetRegistry {
    /// The process-wide registry of built-in presets.
    #[must_use]
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    /// Start building a custom registry.
    #[must_use]
    pub fn builder() -> PresetRegistryBuilder {
        PresetRegistryBuilder::default()
    }

    /// Look up a preset by slug or display title.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Preset> {
        self.presets.get(&slugify(name))
    }

    /// Check if a preset is registered.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All presets, sorted by slug.
    #[must_use]
    pub fn list(&self) -> Vec<&Preset> {
        let mut presets: Vec<_> = self.presets.values().collect();
        presets.sort_by(|a, b| a.slug.cmp(&b.slug));
        presets
    }

    /// All registered slugs, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.list().into_iter().map(|p| p.slug.as_str()).collect()
    }

    /// Number of registered presets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.presets.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Resolve a preset and merge `overrides` onto it.
    ///
    /// # Errors
    ///
    /// Returns [`PresetError::PresetNotFound`] for an unknown name and
    /// [`PresetError::Invalid`] when the merged document fails validation.
    pub fn resolve(&self, name: &str, overrides: &Value) -> Result<WorkflowConfig, PresetError> {
        let preset = self.get(name).ok_or_else(|| PresetError::PresetNotFound {
            name: name.to_string(),
            available: self.names().join(", "),
        })?;

        let merged = merge_overrides(&preset.config.to_document(), overrides);
        let config = validate(&merged).map_err(|errors| PresetError::Invalid {
            name: preset.slug.clone(),
            errors,
        })?;

        tracing::debug!(preset = %preset.slug, kind = %config.kind, "preset resolved");
        Ok(config)
    }
}

/// Builder for a [`PresetRegistry`].
#[derive(Debug, Default)]
pub struct PresetRegistryBuilder {
    registry: PresetRegistry,
}

impl PresetRegistryBuilder {
    /// Add a preset. A preset with the same slug is replaced.
    #[must_use]
    pub fn with_preset(mut self, preset: Preset) -> Self {
        self.registry.presets.insert(preset.slug.clone(), preset);
        self
    }

    /// Add every built-in preset.
    #[must_use]
    pub fn with_builtins(self) -> Self {
        builtin_presets()
            .into_iter()
            .fold(self, PresetRegistryBuilder::with_preset)
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> PresetRegistry {
        self.registry
    }
}

/// Resolve `name` in `registry` with `overrides` merged on top.
///
/// # Errors
///
/// See [`PresetRegistry::resolve`].
pub fn resolve_preset(
    registry: &PresetRegistry,
    name: &str,
    overrides: &Value,
) -> Result<WorkflowConfig, PresetError> {
    registry.resolve(name, overrides)
}

/// Normalize a preset title or slug: lowercase ASCII alphanumerics separated by
/// single hyphens.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Merge an override document onto a preset document following the
/// per-field policy in the module docs.
#[must_use]
pub fn merge_overrides(base: &Value, overrides: &Value) -> Value {
    if overrides.is_null() {
        return base.clone();
    }
    let mut merged = base.clone();
    match (merged.as_object_mut(), overrides.as_object()) {
        (Some(target), Some(patch)) => {
            for (key, value) in patch {
                match key.as_str() {
                    "options" => merge_section(target, key, value, merge_options),
                    _ => replace(target, key, value),
                }
            }
            merged
        }
        _ => overrides.clone(),
    }
}

fn merge_options(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        match key.as_str() {
            "triggers" | "build" => merge_section(target, key, value, replace_leaves),
            _ => replace(target, key, value),
        }
    }
}

fn replace_leaves(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        replace(target, key, value);
    }
}

fn replace(target: &mut Map<String, Value>, key: &str, value: &Value) {
    target.insert(key.to_string(), value.clone());
}

/// Merge `value` into `target[key]` with `merge` when both are mappings;
/// otherwise the override replaces the section.
fn merge_section(
    target: &mut Map<String, Value>,
    key: &str,
    value: &Value,
    merge: fn(&mut Map<String, Value>, &Map<String, Value>),
) {
    match (target.get_mut(key).and_then(Value::as_object_mut), value.as_object()) {
        (Some(existing), Some(patch)) => merge(existing, patch),
        _ => replace(target, key, value),
    }
}

fn triggers(branches: &[&str], events: &[Event]) -> Triggers {
    Triggers {
        branches: branches.iter().map(ToString::to_string).collect(),
        events: events.to_vec(),
    }
}

fn options(triggers: Triggers, build: Option<BuildOptions>) -> Options {
    Options {
        triggers,
        build,
        node_version: crate::config::DEFAULT_NODE_VERSION.to_string(),
        package_manager: PackageManager::Npm,
    }
}

fn preset(title: &str, description: &str, kind: Kind, options: Options) -> Preset {
    Preset::new(
        title,
        description,
        WorkflowConfig {
            name: None,
            kind,
            options,
        },
    )
}

fn builtin_presets() -> Vec<Preset> {
    let branch_and_pr = || triggers(&["main"], &[Event::Push, Event::PullRequest]);

    vec![
        preset(
            "React Native Static Analysis",
            "ESLint, TypeScript and Prettier checks on pushes and pull requests",
            Kind::StaticAnalysis,
            options(branch_and_pr(), None),
        ),
        preset(
            "React Native Test",
            "Jest test suite with coverage report artifact",
            Kind::Test,
            options(branch_and_pr(), None),
        ),
        preset(
            "React Native Lint",
            "ESLint on pull requests",
            Kind::Lint,
            options(triggers(&["main"], &[Event::PullRequest]), None),
        ),
        preset(
            "React Native Android Release",
            "Android release APK stored as a workflow artifact, summarized on the pull request",
            Kind::Build,
            options(
                triggers(&["main"], &[Event::Push]),
                Some(BuildOptions {
                    platform: Platform::Android,
                    variant: Variant::Release,
                    storage: Storage::Github,
                    notification: vec![Notification::PrComment],
                    environment: None,
                }),
            ),
        ),
        preset(
            "React Native iOS Release",
            "Signed iOS release uploaded to TestFlight with a Slack notification",
            Kind::Build,
            options(
                triggers(&["main"], &[Event::Push, Event::WorkflowDispatch]),
                Some(BuildOptions {
                    platform: Platform::Ios,
                    variant: Variant::Release,
                    storage: Storage::Testflight,
                    notification: vec![Notification::Slack],
                    environment: None,
                }),
            ),
        ),
        preset(
            "React Native Android Debug",
            "Android debug build distributed through Firebase App Distribution",
            Kind::Build,
            options(
                triggers(&["develop"], &[Event::Push, Event::PullRequest]),
                Some(BuildOptions {
                    platform: Platform::Android,
                    variant: Variant::Debug,
                    storage: Storage::Firebase,
                    notification: vec![Notification::Slack],
                    environment: None,
                }),
            ),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_presets_are_valid() {
        let registry = PresetRegistry::builtin();
        assert_eq!(registry.len(), 6);
        for preset in registry.list() {
            let resolved = registry.resolve(&preset.slug, &Value::Null).unwrap();
            assert_eq!(resolved, preset.config, "preset {}", preset.slug);
        }
    }

    #[test]
    fn test_builtin_is_shared() {
        assert!(std::ptr::eq(PresetRegistry::builtin(), PresetRegistry::builtin()));
    }

    #[test]
    fn test_lookup_by_title_or_slug() {
        let registry = PresetRegistry::builtin();
        let by_title = registry.get("React Native Static Analysis").unwrap();
        let by_slug = registry.get("react-native-static-analysis").unwrap();
        assert_eq!(by_title, by_slug);
        assert_eq!(by_title.config.kind, Kind::StaticAnalysis);
        assert!(registry.has("react native ios release"));
    }

    #[test]
    fn test_list_sorted() {
        let names = PresetRegistry::builtin().names();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_preset_not_found() {
        let err = PresetRegistry::builtin()
            .resolve("does-not-exist", &json!({}))
            .unwrap_err();
        match err {
            PresetError::PresetNotFound { name, available } => {
                assert_eq!(name, "does-not-exist");
                assert!(available.contains("react-native-lint"));
            }
            other => panic!("expected PresetNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_override_platform_wins() {
        let config = resolve_preset(
            PresetRegistry::builtin(),
            "react-native-android-release",
            &json!({ "options": { "build": { "platform": "ios" } } }),
        )
        .unwrap();
        let build = config.options.build.unwrap();
        assert_eq!(build.platform, Platform::Ios);
        // untouched fields keep preset values
        assert_eq!(build.variant, Variant::Release);
        assert_eq!(build.notification, vec![Notification::PrComment]);
    }

    #[test]
    fn test_trigger_lists_replace_wholesale() {
        let config = PresetRegistry::builtin()
            .resolve(
                "react-native-test",
                &json!({ "options": { "triggers": { "branches": ["develop", "main"] } } }),
            )
            .unwrap();
        assert_eq!(config.options.triggers.branches, vec!["develop", "main"]);
        assert_eq!(
            config.options.triggers.events,
            vec![Event::Push, Event::PullRequest]
        );

        let config = PresetRegistry::builtin()
            .resolve(
                "react-native-test",
                &json!({ "options": { "triggers": { "events": ["workflow_dispatch"] } } }),
            )
            .unwrap();
        assert_eq!(config.options.triggers.events, vec![Event::WorkflowDispatch]);
    }

    #[test]
    fn test_null_override_resets_to_default() {
        let config = PresetRegistry::builtin()
            .resolve(
                "react-native-ios-release",
                &json!({ "options": { "build": { "notification": null, "storage": null } } }),
            )
            .unwrap();
        let build = config.options.build.unwrap();
        assert!(build.notification.is_empty());
        assert_eq!(build.storage, Storage::Github);
    }

    #[test]
    fn test_invalid_merge_reports_validation_errors() {
        let err = PresetRegistry::builtin()
            .resolve(
                "react-native-android-debug",
                &json!({
                    "options": { "build": { "platform": "windows", "colour": "red" } }
                }),
            )
            .unwrap_err();
        match err {
            PresetError::Invalid { name, errors } => {
                assert_eq!(name, "react-native-android-debug");
                assert_eq!(
                    errors.paths(),
                    vec!["options.build.colour", "options.build.platform"]
                );
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn test_kind_override_conflicting_with_build_section() {
        let err = PresetRegistry::builtin()
            .resolve("react-native-android-release", &json!({ "kind": "lint" }))
            .unwrap_err();
        assert!(matches!(err, PresetError::Invalid { .. }));
    }

    #[test]
    fn test_custom_registry() {
        let base = PresetRegistry::builtin()
            .get("react-native-lint")
            .unwrap()
            .config
            .clone();
        let registry = PresetRegistry::builder()
            .with_preset(Preset::new("Team Lint", "lint on every branch", base))
            .build();
        assert_eq!(registry.names(), vec!["team-lint"]);
        assert!(registry.get("react-native-lint").is_none());
    }

    #[test]
    fn test_merge_replaces_non_mapping_sections() {
        let base = json!({ "kind": "lint", "options": { "triggers": { "branches": ["main"] } } });
        let merged = merge_overrides(&base, &json!({ "options": "oops" }));
        assert_eq!(merged["options"], json!("oops"));
        assert_eq!(merged["kind"], json!("lint"));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("React Native Static Analysis"), "react-native-static-analysis");
        assert_eq!(slugify("  iOS -- Release!  "), "ios-release");
        assert_eq!(slugify("react-native-lint"), "react-native-lint");
    }
}
