//! Configuration schema for workflow generation.
//!
//! A configuration document has the shape:
//!
//! ```yaml
//! kind: build
//! options:
//!   triggers:
//!     branches: [main]
//!     events: [push]
//!   build:
//!     platform: android
//!     variant: release
//!     storage: github
//!     notification: pr-comment
//! ```
//!
//! Every enum-like field is a closed set parsed at the validation boundary.
//! New values are added as new variants; existing values never change meaning.

mod validate;

pub use validate::{ValidationError, ValidationErrors, validate};
pub(crate) use validate::describe;

use serde::Serialize;
use serde_json::{Map, Value, json};

/// Version of the configuration schema understood by this engine.
pub const SCHEMA_VERSION: u32 = 1;

/// Node.js version used when `options.nodeVersion` is absent.
pub const DEFAULT_NODE_VERSION: &str = "20";

/// A closed set of string values accepted in a configuration document.
pub trait ConfigEnum: Sized + Copy + 'static {
    /// Every accepted value, in declaration order.
    const ALL: &'static [Self];

    /// Canonical string form used in configuration documents.
    fn as_str(self) -> &'static str;

    /// Parse a value from its canonical string form.
    fn parse(value: &str) -> Option<Self>;

    /// Human-readable list of accepted values, for error messages.
    #[must_use]
    fn expected() -> String {
        Self::ALL
            .iter()
            .map(|v| format!("`{}`", v.as_str()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

macro_rules! config_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $value:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $value)] $variant, )+
        }

        impl ConfigEnum for $name {
            const ALL: &'static [Self] = &[$(Self::$variant),+];

            fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $value,)+
                }
            }

            fn parse(value: &str) -> Option<Self> {
                match value {
                    $($value => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

config_enum! {
    /// Workflow kind, selecting the job template set.
    pub enum Kind {
        /// Native app build with artifact storage and notifications
        Build => "build",
        /// Unit test run with coverage artifact
        Test => "test",
        /// Lint script only
        Lint => "lint",
        /// Lint, type-check and formatting check
        StaticAnalysis => "static-analysis",
    }
}

config_enum! {
    /// Target mobile platform.
    pub enum Platform {
        /// Android (Gradle)
        Android => "android",
        /// iOS (Xcode)
        Ios => "ios",
    }
}

config_enum! {
    /// Build variant.
    pub enum Variant {
        /// Debug build
        Debug => "debug",
        /// Release build
        Release => "release",
    }
}

config_enum! {
    /// Destination for build artifacts.
    pub enum Storage {
        /// GitHub Actions artifact storage
        Github => "github",
        /// Amazon S3 bucket
        S3 => "s3",
        /// Firebase App Distribution
        Firebase => "firebase",
        /// App Store Connect TestFlight (iOS only)
        Testflight => "testflight",
    }
}

config_enum! {
    /// Channel notified when a build finishes.
    pub enum Notification {
        /// Comment on the triggering pull request
        PrComment => "pr-comment",
        /// Slack incoming webhook
        Slack => "slack",
        /// Email over SMTP
        Email => "email",
    }
}

config_enum! {
    /// JavaScript package manager used to install dependencies and run scripts.
    pub enum PackageManager {
        /// npm
        Npm => "npm",
        /// Yarn (classic lockfile semantics)
        Yarn => "yarn",
        /// pnpm
        Pnpm => "pnpm",
    }
}

config_enum! {
    /// Repository event that triggers the workflow.
    pub enum Event {
        /// Push to a matching branch
        Push => "push",
        /// Pull request targeting a matching branch
        PullRequest => "pull_request",
        /// Manual run from the Actions UI
        WorkflowDispatch => "workflow_dispatch",
    }
}

impl Event {
    /// Parse an event name written in any common casing or separator style.
    ///
    /// `pull-request`, `PullRequest`, `pullRequest` and `PULL_REQUEST` all map
    /// to [`Event::PullRequest`].
    #[must_use]
    pub fn normalize(raw: &str) -> Option<Self> {
        let mut canonical = String::with_capacity(raw.len() + 4);
        let mut previous: Option<char> = None;
        for ch in raw.trim().chars() {
            match ch {
                '-' | ' ' | '_' => {
                    if !canonical.ends_with('_') {
                        canonical.push('_');
                    }
                }
                c if c.is_ascii_uppercase() => {
                    if previous.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit()) {
                        canonical.push('_');
                    }
                    canonical.push(c.to_ascii_lowercase());
                }
                c => canonical.push(c),
            }
            previous = Some(ch);
        }
        Self::parse(&canonical)
    }

    /// Whether the event accepts a `branches` filter.
    #[must_use]
    pub const fn filters_branches(self) -> bool {
        matches!(self, Self::Push | Self::PullRequest)
    }
}

impl Platform {
    /// Display name used in job and workflow names.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Android => "Android",
            Self::Ios => "iOS",
        }
    }
}

impl Variant {
    /// Capitalized form used by Gradle tasks and Xcode configurations.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Debug => "Debug",
            Self::Release => "Release",
        }
    }
}

impl Kind {
    /// Display name used as the default workflow name for non-build kinds.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Build => "Build",
            Self::Test => "Test",
            Self::Lint => "Lint",
            Self::StaticAnalysis => "Static Analysis",
        }
    }
}

/// A validated workflow configuration with all defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Explicit workflow display name, if the document set one
    pub name: Option<String>,
    /// Workflow kind
    pub kind: Kind,
    /// Kind-specific options
    pub options: Options,
}

/// Options shared by every kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// When the workflow runs
    pub triggers: Triggers,
    /// Build options; present if and only if `kind` is `build`
    pub build: Option<BuildOptions>,
    /// Node.js version passed to `actions/setup-node`
    pub node_version: String,
    /// Package manager used for install and script steps
    pub package_manager: PackageManager,
}

/// Trigger configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triggers {
    /// Branch patterns in caller order, without duplicates
    pub branches: Vec<String>,
    /// Events in canonical order, without duplicates
    pub events: Vec<Event>,
}

/// Options for `kind: build`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Target platform
    pub platform: Platform,
    /// Build variant
    pub variant: Variant,
    /// Artifact destination
    pub storage: Storage,
    /// Notification channels in caller order; empty means no notify job
    pub notification: Vec<Notification>,
    /// Deployment environment gating the build job
    pub environment: Option<String>,
}

impl WorkflowConfig {
    /// Workflow display name: the explicit `name`, or one derived from the
    /// kind and build options (e.g. "Android Release Build").
    #[must_use]
    pub fn workflow_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        match &self.options.build {
            Some(build) => format!(
                "{} {} Build",
                build.platform.display_name(),
                build.variant.title()
            ),
            None => self.kind.display_name().to_string(),
        }
    }

    /// Serialize back into the document shape accepted by [`validate`].
    ///
    /// Preset merging works on this form so user overrides follow exactly the
    /// same validation path as a hand-written document.
    #[must_use]
    pub fn to_document(&self) -> Value {
        let mut triggers = Map::new();
        triggers.insert("branches".into(), json!(self.options.triggers.branches));
        triggers.insert(
            "events".into(),
            json!(
                self.options
                    .triggers
                    .events
                    .iter()
                    .map(|e| e.as_str())
                    .collect::<Vec<_>>()
            ),
        );

        let mut options = Map::new();
        options.insert("triggers".into(), Value::Object(triggers));
        if let Some(build) = &self.options.build {
            options.insert("build".into(), build.to_document());
        }
        options.insert("nodeVersion".into(), json!(self.options.node_version));
        options.insert(
            "packageManager".into(),
            json!(self.options.package_manager.as_str()),
        );

        let mut root = Map::new();
        if let Some(name) = &self.name {
            root.insert("name".into(), json!(name));
        }
        root.insert("kind".into(), json!(self.kind.as_str()));
        root.insert("options".into(), Value::Object(options));
        Value::Object(root)
    }
}

impl BuildOptions {
    fn to_document(&self) -> Value {
        let mut build = Map::new();
        build.insert("platform".into(), json!(self.platform.as_str()));
        build.insert("variant".into(), json!(self.variant.as_str()));
        build.insert("storage".into(), json!(self.storage.as_str()));
        build.insert(
            "notification".into(),
            json!(
                self.notification
                    .iter()
                    .map(|n| n.as_str())
                    .collect::<Vec<_>>()
            ),
        );
        if let Some(environment) = &self.environment {
            build.insert("environment".into(), json!(environment));
        }
        Value::Object(build)
    }
}
