//! Configuration validation
//!
//! Walks a raw document and reports every defect in one pass, each tagged with
//! the dotted path of the offending field.

use super::{
    BuildOptions, ConfigEnum, DEFAULT_NODE_VERSION, Event, Kind, Notification, Options,
    PackageManager, Platform, Storage, Triggers, Variant, WorkflowConfig,
};
use miette::Diagnostic;
use serde_json::{Map, Value};
use thiserror::Error;

const ROOT_KEYS: &[&str] = &["name", "kind", "options"];
const OPTION_KEYS: &[&str] = &["triggers", "build", "nodeVersion", "packageManager"];
const TRIGGER_KEYS: &[&str] = &["branches", "events"];
const BUILD_KEYS: &[&str] = &[
    "platform",
    "variant",
    "storage",
    "notification",
    "environment",
];

/// A single malformed, missing or unknown configuration field.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("{path}: {reason}")]
#[diagnostic(code(rnflow::config::invalid_field))]
pub struct ValidationError {
    /// Dotted field path, e.g. `options.build.platform`
    pub path: String,
    /// Human-readable reason
    pub reason: String,
}

impl ValidationError {
    /// Create a new validation error.
    #[must_use]
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Every validation error found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("configuration is invalid ({} error(s))", .errors.len())]
#[diagnostic(
    code(rnflow::config::invalid),
    help("fix every listed field; all problems are reported in a single pass")
)]
pub struct ValidationErrors {
    /// The individual errors, in document order
    #[related]
    pub errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Wrap a single error.
    #[must_use]
    pub fn single(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            errors: vec![ValidationError::new(path, reason)],
        }
    }

    /// Number of errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether there are no errors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterate over the errors.
    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.errors.iter()
    }

    /// Field paths of every error, in report order.
    #[must_use]
    pub fn paths(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.path.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// Validate a raw configuration document.
///
/// On success every optional field is defaulted. On failure all independent
/// defects are returned together rather than only the first.
///
/// # Errors
///
/// Returns [`ValidationErrors`] listing every malformed, missing or unknown
/// field.
pub fn validate(raw: &Value) -> Result<WorkflowConfig, ValidationErrors> {
    let result = ConfigValidator::default().run(raw);
    match &result {
        Ok(config) => tracing::debug!(
            kind = %config.kind,
            branches = config.options.triggers.branches.len(),
            "configuration validated"
        ),
        Err(errors) => tracing::debug!(count = errors.len(), "configuration rejected"),
    }
    result
}

/// Describe the JSON type of a value for error messages.
pub(crate) fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

/// Look up a key, treating an explicit `null` the same as absence.
fn present<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !v.is_null())
}

fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

#[derive(Debug, Default)]
struct ConfigValidator {
    errors: Vec<ValidationError>,
}

impl ConfigValidator {
    fn push(&mut self, path: impl Into<String>, reason: impl Into<String>) {
        self.errors.push(ValidationError::new(path, reason));
    }

    fn run(mut self, raw: &Value) -> Result<WorkflowConfig, ValidationErrors> {
        let Some(root) = self.mapping(raw, "$") else {
            return Err(self.finish());
        };
        self.reject_unknown_keys("", root, ROOT_KEYS);

        let name = self.optional_string(root, "", "name");
        let kind = match present(root, "kind") {
            None => {
                self.push("kind", "missing required field");
                None
            }
            Some(value) => self.enum_value::<Kind>(value, "kind"),
        };
        let options = match present(root, "options") {
            None => {
                self.push("options", "missing required field");
                None
            }
            Some(value) => self.options(value, kind),
        };

        match (kind, options) {
            (Some(kind), Some(options)) if self.errors.is_empty() => Ok(WorkflowConfig {
                name,
                kind,
                options,
            }),
            _ => Err(self.finish()),
        }
    }

    fn finish(self) -> ValidationErrors {
        ValidationErrors {
            errors: self.errors,
        }
    }

    fn mapping<'a>(&mut self, value: &'a Value, path: &str) -> Option<&'a Map<String, Value>> {
        if let Some(map) = value.as_object() {
            Some(map)
        } else {
            self.push(path, format!("expected a mapping, found {}", describe(value)));
            None
        }
    }

    fn reject_unknown_keys(&mut self, parent: &str, map: &Map<String, Value>, known: &[&str]) {
        for key in map.keys() {
            if !known.contains(&key.as_str()) {
                self.push(
                    join(parent, key),
                    format!(
                        "unknown field; expected one of {}",
                        known
                            .iter()
                            .map(|k| format!("`{k}`"))
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                );
            }
        }
    }

    fn optional_string(
        &mut self,
        map: &Map<String, Value>,
        parent: &str,
        key: &str,
    ) -> Option<String> {
        let value = present(map, key)?;
        let path = join(parent, key);
        match value.as_str().map(str::trim) {
            Some("") => {
                self.push(path, "must not be empty");
                None
            }
            Some(s) => Some(s.to_string()),
            None => {
                self.push(path, format!("expected a string, found {}", describe(value)));
                None
            }
        }
    }

    fn enum_value<T: ConfigEnum>(&mut self, value: &Value, path: &str) -> Option<T> {
        let Some(raw) = value.as_str() else {
            self.push(path, format!("expected a string, found {}", describe(value)));
            return None;
        };
        let parsed = T::parse(raw);
        if parsed.is_none() {
            self.push(
                path,
                format!("unsupported value `{raw}`; expected one of {}", T::expected()),
            );
        }
        parsed
    }

    /// Accept either a single string or a list of strings.
    fn string_or_list<'a>(&mut self, value: &'a Value, path: &str) -> Option<Vec<&'a Value>> {
        match value {
            Value::String(_) => Some(vec![value]),
            Value::Array(items) => Some(items.iter().collect()),
            other => {
                self.push(
                    path,
                    format!("expected a string or a list, found {}", describe(other)),
                );
                None
            }
        }
    }

    fn options(&mut self, value: &Value, kind: Option<Kind>) -> Option<Options> {
        let map = self.mapping(value, "options")?;
        self.reject_unknown_keys("options", map, OPTION_KEYS);

        let triggers = match present(map, "triggers") {
            None => {
                self.push("options.triggers", "missing required field");
                None
            }
            Some(value) => self.triggers(value),
        };
        let build = self.build_section(present(map, "build"), kind);
        let node_version = self
            .optional_string(map, "options", "nodeVersion")
            .unwrap_or_else(|| DEFAULT_NODE_VERSION.to_string());
        let package_manager = match present(map, "packageManager") {
            None => Some(PackageManager::Npm),
            Some(value) => self.enum_value(value, "options.packageManager"),
        };

        Some(Options {
            triggers: triggers?,
            build: build?,
            node_version,
            package_manager: package_manager?,
        })
    }

    fn triggers(&mut self, value: &Value) -> Option<Triggers> {
        let map = self.mapping(value, "options.triggers")?;
        self.reject_unknown_keys("options.triggers", map, TRIGGER_KEYS);

        let branches = match present(map, "branches") {
            None => {
                self.push("options.triggers.branches", "missing required field");
                None
            }
            Some(value) => self.branches(value),
        };
        let events = match present(map, "events") {
            None => Some(vec![Event::Push]),
            Some(value) => self.events(value),
        };

        Some(Triggers {
            branches: branches?,
            events: events?,
        })
    }

    fn branches(&mut self, value: &Value) -> Option<Vec<String>> {
        let path = "options.triggers.branches";
        let items = self.string_or_list(value, path)?;
        if items.is_empty() {
            self.push(path, "must list at least one branch pattern");
            return None;
        }

        let before = self.errors.len();
        let mut branches: Vec<String> = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let item_path = format!("{path}[{index}]");
            match item.as_str().map(str::trim) {
                Some("") => self.push(item_path, "branch pattern must not be empty"),
                Some(pattern) => {
                    if !branches.iter().any(|b| b == pattern) {
                        branches.push(pattern.to_string());
                    }
                }
                None => self.push(
                    item_path,
                    format!("expected a string, found {}", describe(item)),
                ),
            }
        }
        (self.errors.len() == before).then_some(branches)
    }

    fn events(&mut self, value: &Value) -> Option<Vec<Event>> {
        let path = "options.triggers.events";
        let items = self.string_or_list(value, path)?;
        if items.is_empty() {
            self.push(path, "must list at least one event");
            return None;
        }

        let before = self.errors.len();
        let mut events = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let item_path = format!("{path}[{index}]");
            let Some(raw) = item.as_str() else {
                self.push(
                    item_path,
                    format!("expected a string, found {}", describe(item)),
                );
                continue;
            };
            match Event::normalize(raw) {
                Some(event) => events.push(event),
                None => self.push(
                    item_path,
                    format!(
                        "unsupported event `{raw}`; expected one of {}",
                        Event::expected()
                    ),
                ),
            }
        }
        events.sort_unstable();
        events.dedup();
        (self.errors.len() == before).then_some(events)
    }

    /// `options.build` must be present for `kind: build` and absent otherwise.
    fn build_section(
        &mut self,
        value: Option<&Value>,
        kind: Option<Kind>,
    ) -> Option<Option<BuildOptions>> {
        match (kind, value) {
            (Some(Kind::Build), None) => {
                self.push("options.build", "required when kind is `build`");
                None
            }
            (Some(kind), Some(_)) if kind != Kind::Build => {
                self.push(
                    "options.build",
                    format!("not applicable to kind `{kind}`; only `build` accepts build options"),
                );
                None
            }
            (_, Some(value)) => self.build_options(value).map(Some),
            (_, None) => Some(None),
        }
    }

    fn build_options(&mut self, value: &Value) -> Option<BuildOptions> {
        let path = "options.build";
        let map = self.mapping(value, path)?;
        self.reject_unknown_keys(path, map, BUILD_KEYS);

        let platform = match present(map, "platform") {
            None => {
                self.push("options.build.platform", "missing required field");
                None
            }
            Some(value) => self.enum_value::<Platform>(value, "options.build.platform"),
        };
        let variant = match present(map, "variant") {
            None => Some(Variant::Release),
            Some(value) => self.enum_value(value, "options.build.variant"),
        };
        let storage = match present(map, "storage") {
            None => Some(Storage::Github),
            Some(value) => self.enum_value(value, "options.build.storage"),
        };
        let notification = match present(map, "notification") {
            None => Some(Vec::new()),
            Some(value) => self.notifications(value),
        };
        let environment = self.optional_string(map, path, "environment");

        Some(BuildOptions {
            platform: platform?,
            variant: variant?,
            storage: storage?,
            notification: notification?,
            environment,
        })
    }

    fn notifications(&mut self, value: &Value) -> Option<Vec<Notification>> {
        let path = "options.build.notification";
        let items = self.string_or_list(value, path)?;
        let single = value.is_string();

        let before = self.errors.len();
        let mut channels = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let item_path = if single {
                path.to_string()
            } else {
                format!("{path}[{index}]")
            };
            if let Some(channel) = self.enum_value::<Notification>(item, &item_path)
                && !channels.contains(&channel)
            {
                channels.push(channel);
            }
        }
        (self.errors.len() == before).then_some(channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build_doc(build: Value) -> Value {
        json!({
            "kind": "build",
            "options": {
                "triggers": { "branches": ["main"], "events": ["push"] },
                "build": build
            }
        })
    }

    #[test]
    fn test_valid_build_config() {
        let config = validate(&build_doc(json!({
            "platform": "android",
            "variant": "release",
            "storage": "github",
            "notification": "pr-comment"
        })))
        .unwrap();

        assert_eq!(config.kind, Kind::Build);
        let build = config.options.build.unwrap();
        assert_eq!(build.platform, Platform::Android);
        assert_eq!(build.variant, Variant::Release);
        assert_eq!(build.storage, Storage::Github);
        assert_eq!(build.notification, vec![Notification::PrComment]);
        assert_eq!(config.options.triggers.branches, vec!["main"]);
        assert_eq!(config.options.triggers.events, vec![Event::Push]);
    }

    #[test]
    fn test_defaults_applied() {
        let config = validate(&build_doc(json!({ "platform": "ios" }))).unwrap();
        let build = config.options.build.as_ref().unwrap();
        assert_eq!(build.variant, Variant::Release);
        assert_eq!(build.storage, Storage::Github);
        assert!(build.notification.is_empty());
        assert_eq!(build.environment, None);
        assert_eq!(config.options.node_version, "20");
        assert_eq!(config.options.package_manager, PackageManager::Npm);

        let config = validate(&json!({
            "kind": "lint",
            "options": { "triggers": { "branches": "main" } }
        }))
        .unwrap();
        assert_eq!(config.options.triggers.events, vec![Event::Push]);
        assert_eq!(config.options.triggers.branches, vec!["main"]);
    }

    #[test]
    fn test_unsupported_kind() {
        let errors = validate(&json!({ "kind": "deploy-to-moon" })).unwrap_err();
        assert!(errors.paths().contains(&"kind"));
        let kind_error = errors.iter().find(|e| e.path == "kind").unwrap();
        assert!(kind_error.reason.contains("deploy-to-moon"));
        assert!(kind_error.reason.contains("`build`"));
    }

    #[test]
    fn test_reports_every_independent_defect() {
        let errors = validate(&json!({
            "kind": "build",
            "options": {
                "triggers": { "branches": [], "events": ["push", "merge"] },
                "build": {
                    "platform": "windows",
                    "variant": "beta",
                    "storage": "dropbox",
                    "notification": ["slack", "pager"]
                }
            }
        }))
        .unwrap_err();

        assert_eq!(
            errors.paths(),
            vec![
                "options.triggers.branches",
                "options.triggers.events[1]",
                "options.build.platform",
                "options.build.variant",
                "options.build.storage",
                "options.build.notification[1]",
            ]
        );
    }

    #[test]
    fn test_missing_containers_report_once() {
        let errors = validate(&json!({ "kind": "build", "options": {} })).unwrap_err();
        assert_eq!(errors.paths(), vec!["options.triggers", "options.build"]);

        let errors = validate(&json!({})).unwrap_err();
        assert_eq!(errors.paths(), vec!["kind", "options"]);
    }

    #[test]
    fn test_root_must_be_mapping() {
        let errors = validate(&json!(["build"])).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.errors[0].path, "$");
        assert!(errors.errors[0].reason.contains("a list"));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let errors = validate(&build_doc(json!({
            "platfrom": "android",
            "platform": "android"
        })))
        .unwrap_err();
        assert_eq!(errors.paths(), vec!["options.build.platfrom"]);
    }

    #[test]
    fn test_build_options_rejected_for_other_kinds() {
        let errors = validate(&json!({
            "kind": "test",
            "options": {
                "triggers": { "branches": ["main"] },
                "build": { "platform": "android" }
            }
        }))
        .unwrap_err();
        assert_eq!(errors.paths(), vec!["options.build"]);
        assert!(errors.errors[0].reason.contains("`test`"));
    }

    #[test]
    fn test_type_errors() {
        let errors = validate(&json!({
            "name": 3,
            "kind": true,
            "options": {
                "triggers": { "branches": [1, ""] },
                "nodeVersion": "",
                "packageManager": "bun"
            }
        }))
        .unwrap_err();
        assert_eq!(
            errors.paths(),
            vec![
                "name",
                "kind",
                "options.triggers.branches[0]",
                "options.triggers.branches[1]",
                "options.nodeVersion",
                "options.packageManager",
            ]
        );
    }

    #[test]
    fn test_branches_keep_order_and_drop_duplicates() {
        let config = validate(&json!({
            "kind": "lint",
            "options": {
                "triggers": {
                    "branches": ["release/*", "main", "release/*"],
                    "events": ["workflow_dispatch", "PullRequest", "push", "pull-request"]
                }
            }
        }))
        .unwrap();
        assert_eq!(config.options.triggers.branches, vec!["release/*", "main"]);
        assert_eq!(
            config.options.triggers.events,
            vec![Event::Push, Event::PullRequest, Event::WorkflowDispatch]
        );
    }

    #[test]
    fn test_notification_forms() {
        let single = validate(&build_doc(json!({ "platform": "android", "notification": "slack" })))
            .unwrap();
        assert_eq!(
            single.options.build.unwrap().notification,
            vec![Notification::Slack]
        );

        let empty = validate(&build_doc(json!({ "platform": "android", "notification": [] })))
            .unwrap();
        assert!(empty.options.build.unwrap().notification.is_empty());

        let null = validate(&build_doc(json!({ "platform": "android", "notification": null })))
            .unwrap();
        assert!(null.options.build.unwrap().notification.is_empty());

        let errors = validate(&build_doc(json!({ "platform": "android", "notification": "sms" })))
            .unwrap_err();
        assert_eq!(errors.paths(), vec!["options.build.notification"]);
    }

    #[test]
    fn test_error_display_includes_path() {
        let error = ValidationError::new("options.build.platform", "missing required field");
        assert_eq!(
            error.to_string(),
            "options.build.platform: missing required field"
        );
    }
}
