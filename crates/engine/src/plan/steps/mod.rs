//! Step contributors
//!
//! Every step in a plan comes from a [`StepContributor`]. The plan builder
//! asks each contributor whether it applies to a job and collects the steps
//! of the active ones, then orders them by `(phase, priority)`. Contributor
//! list order only breaks ties, so adding a contributor never reorders the
//! steps of another phase.
//!
//! ## Available Contributors
//!
//! - Setup: `CheckoutContributor`, `PnpmContributor`, `NodeContributor`,
//!   `JavaContributor`, `InstallContributor`, `PodsContributor`
//! - Kind: `AndroidBuildContributor`, `IosBuildContributor`,
//!   `TestContributor`, `LintContributor`, `StaticAnalysisContributor`
//! - Artifact: `StorageContributor`, `CoverageContributor`
//! - Notify: `PrCommentContributor`, `SlackContributor`, `EmailContributor`

mod artifact;
mod checks;
mod native;
mod notify;
mod setup;

pub use artifact::{CoverageContributor, StorageContributor};
pub use checks::{LintContributor, StaticAnalysisContributor, TestContributor};
pub use native::{AndroidBuildContributor, IosBuildContributor};
pub use notify::{EmailContributor, PrCommentContributor, SlackContributor};
pub use setup::{
    CheckoutContributor, InstallContributor, JavaContributor, NodeContributor, PnpmContributor,
    PodsContributor,
};

use super::StepPlan;
use crate::config::{BuildOptions, ConfigEnum, Kind, PackageManager, Platform, WorkflowConfig};

/// Ordering phase of a step within its job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StepPhase {
    /// Repository checkout
    Checkout,
    /// Language toolchains and caches
    Toolchain,
    /// Dependency installation
    Install,
    /// Build, test or check commands of the workflow kind
    Kind,
    /// Artifact upload and distribution
    Artifact,
    /// Notifications
    Notify,
}

/// What a job does in the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobRole {
    /// The main job of the workflow kind
    Primary,
    /// The notification job that follows a build
    Notify,
}

/// Input a contributor sees for one job.
#[derive(Debug, Clone, Copy)]
pub struct JobContext<'a> {
    /// The validated configuration
    pub config: &'a WorkflowConfig,
    /// The job being assembled
    pub role: JobRole,
}

impl<'a> JobContext<'a> {
    /// Context for the primary job.
    #[must_use]
    pub const fn primary(config: &'a WorkflowConfig) -> Self {
        Self {
            config,
            role: JobRole::Primary,
        }
    }

    /// Context for the notification job.
    #[must_use]
    pub const fn notify(config: &'a WorkflowConfig) -> Self {
        Self {
            config,
            role: JobRole::Notify,
        }
    }

    /// Whether this is the primary job.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.role == JobRole::Primary
    }

    /// Whether this is the primary job of `kind`.
    #[must_use]
    pub fn is_primary_of(&self, kind: Kind) -> bool {
        self.is_primary() && self.config.kind == kind
    }

    /// Build options, for `kind: build` only.
    #[must_use]
    pub fn build(&self) -> Option<&'a BuildOptions> {
        self.config
            .options
            .build
            .as_ref()
            .filter(|_| self.config.kind == Kind::Build)
    }

    /// Build options when this is the primary build job for `platform`.
    #[must_use]
    pub fn primary_build_for(&self, platform: Platform) -> Option<&'a BuildOptions> {
        self.build()
            .filter(|b| self.is_primary() && b.platform == platform)
    }

    /// Configured package manager.
    #[must_use]
    pub const fn package_manager(&self) -> PackageManager {
        self.config.options.package_manager
    }
}

/// A unit that contributes steps to jobs.
///
/// # Example
///
/// ```ignore
/// struct DetoxContributor;
///
/// impl StepContributor for DetoxContributor {
///     fn id(&self) -> &'static str { "detox" }
///     fn phase(&self) -> StepPhase { StepPhase::Kind }
///
///     fn is_active(&self, ctx: &JobContext<'_>) -> bool {
///         ctx.is_primary_of(Kind::Test)
///     }
///
///     fn contribute(&self, _: &JobContext<'_>) -> Vec<StepPlan> {
///         vec![StepPlan::run("Detox", "npx detox test")]
///     }
/// }
/// ```
pub trait StepContributor: Send + Sync {
    /// Contributor identifier
    fn id(&self) -> &'static str;

    /// Phase the contributed steps belong to
    fn phase(&self) -> StepPhase;

    /// Order within the phase; lower runs first
    fn priority(&self) -> u8 {
        50
    }

    /// Whether the contributor applies to the job.
    fn is_active(&self, ctx: &JobContext<'_>) -> bool;

    /// Steps for the job, in execution order.
    fn contribute(&self, ctx: &JobContext<'_>) -> Vec<StepPlan>;

    /// Notes about behavior the contributor could not provide for the job.
    fn notes(&self, ctx: &JobContext<'_>) -> Vec<String> {
        let _ = ctx;
        Vec::new()
    }
}

/// The default contributor set used by [`build_plan`](super::build_plan).
#[must_use]
pub fn default_contributors() -> Vec<Box<dyn StepContributor>> {
    vec![
        Box::new(CheckoutContributor),
        Box::new(PnpmContributor),
        Box::new(NodeContributor),
        Box::new(JavaContributor),
        Box::new(InstallContributor),
        Box::new(PodsContributor),
        Box::new(AndroidBuildContributor),
        Box::new(IosBuildContributor),
        Box::new(TestContributor),
        Box::new(LintContributor),
        Box::new(StaticAnalysisContributor),
        Box::new(StorageContributor),
        Box::new(CoverageContributor),
        Box::new(PrCommentContributor),
        Box::new(SlackContributor),
        Box::new(EmailContributor),
    ]
}

/// Shell commands of a package manager.
pub(crate) trait PackageManagerCommands {
    /// Lockfile-exact dependency install
    fn install_command(self) -> &'static str;
    /// Run a `package.json` script
    fn run_script(self, script: &str) -> String;
    /// Run a binary from `node_modules`
    fn exec(self, command: &str) -> String;
    /// Run the `test` script with extra arguments forwarded to it
    fn test_with(self, args: &str) -> String;
}

impl PackageManagerCommands for PackageManager {
    fn install_command(self) -> &'static str {
        match self {
            Self::Npm => "npm ci",
            Self::Yarn => "yarn install --frozen-lockfile",
            Self::Pnpm => "pnpm install --frozen-lockfile",
        }
    }

    fn run_script(self, script: &str) -> String {
        match self {
            Self::Npm => format!("npm run {script}"),
            Self::Yarn => format!("yarn {script}"),
            Self::Pnpm => format!("pnpm run {script}"),
        }
    }

    fn exec(self, command: &str) -> String {
        match self {
            Self::Npm => format!("npx {command}"),
            Self::Yarn => format!("yarn {command}"),
            Self::Pnpm => format!("pnpm exec {command}"),
        }
    }

    fn test_with(self, args: &str) -> String {
        match self {
            Self::Npm => format!("npm test -- {args}"),
            Self::Yarn => format!("yarn test {args}"),
            Self::Pnpm => format!("pnpm test {args}"),
        }
    }
}

/// Path of the built application binary.
#[must_use]
pub fn artifact_path(build: &BuildOptions) -> String {
    match build.platform {
        Platform::Android => {
            let variant = build.variant.as_str();
            format!("android/app/build/outputs/apk/{variant}/app-{variant}.apk")
        }
        Platform::Ios => "ios/build/ipa/app.ipa".to_string(),
    }
}

/// Name of the uploaded artifact, e.g. `app-android-release`.
#[must_use]
pub fn artifact_name(build: &BuildOptions) -> String {
    format!("app-{}-{}", build.platform, build.variant)
}
