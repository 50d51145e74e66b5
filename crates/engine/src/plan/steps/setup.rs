//! Checkout, toolchain and dependency install steps.

use super::{JobContext, PackageManagerCommands, StepContributor, StepPhase};
use crate::config::{ConfigEnum, PackageManager, Platform};
use crate::plan::StepPlan;

/// Checks out the repository in every primary job.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckoutContributor;

impl StepContributor for CheckoutContributor {
    fn id(&self) -> &'static str {
        "checkout"
    }

    fn phase(&self) -> StepPhase {
        StepPhase::Checkout
    }

    fn is_active(&self, ctx: &JobContext<'_>) -> bool {
        ctx.is_primary()
    }

    fn contribute(&self, _ctx: &JobContext<'_>) -> Vec<StepPlan> {
        vec![StepPlan::uses("Checkout", "actions/checkout@v4")]
    }
}

/// Installs pnpm. Must precede Node setup so its cache lookup finds pnpm.
#[derive(Debug, Clone, Copy, Default)]
pub struct PnpmContributor;

impl StepContributor for PnpmContributor {
    fn id(&self) -> &'static str {
        "pnpm"
    }

    fn phase(&self) -> StepPhase {
        StepPhase::Toolchain
    }

    fn priority(&self) -> u8 {
        0
    }

    fn is_active(&self, ctx: &JobContext<'_>) -> bool {
        ctx.is_primary() && ctx.package_manager() == PackageManager::Pnpm
    }

    fn contribute(&self, _ctx: &JobContext<'_>) -> Vec<StepPlan> {
        vec![StepPlan::uses("Setup pnpm", "pnpm/action-setup@v4")]
    }
}

/// Sets up Node.js with the package manager's dependency cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeContributor;

impl StepContributor for NodeContributor {
    fn id(&self) -> &'static str {
        "node"
    }

    fn phase(&self) -> StepPhase {
        StepPhase::Toolchain
    }

    fn priority(&self) -> u8 {
        10
    }

    fn is_active(&self, ctx: &JobContext<'_>) -> bool {
        ctx.is_primary()
    }

    fn contribute(&self, ctx: &JobContext<'_>) -> Vec<StepPlan> {
        vec![
            StepPlan::uses("Setup Node.js", "actions/setup-node@v4")
                .with_input("node-version", ctx.config.options.node_version.as_str())
                .with_input("cache", ctx.package_manager().as_str()),
        ]
    }
}

/// Sets up JDK 17 with the Gradle cache for Android builds.
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaContributor;

impl StepContributor for JavaContributor {
    fn id(&self) -> &'static str {
        "java"
    }

    fn phase(&self) -> StepPhase {
        StepPhase::Toolchain
    }

    fn priority(&self) -> u8 {
        20
    }

    fn is_active(&self, ctx: &JobContext<'_>) -> bool {
        ctx.primary_build_for(Platform::Android).is_some()
    }

    fn contribute(&self, _ctx: &JobContext<'_>) -> Vec<StepPlan> {
        vec![
            StepPlan::uses("Setup Java", "actions/setup-java@v4")
                .with_input("distribution", "zulu")
                .with_input("java-version", "17")
                .with_input("cache", "gradle"),
        ]
    }
}

/// Installs JavaScript dependencies from the lockfile.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallContributor;

impl StepContributor for InstallContributor {
    fn id(&self) -> &'static str {
        "install"
    }

    fn phase(&self) -> StepPhase {
        StepPhase::Install
    }

    fn priority(&self) -> u8 {
        0
    }

    fn is_active(&self, ctx: &JobContext<'_>) -> bool {
        ctx.is_primary()
    }

    fn contribute(&self, ctx: &JobContext<'_>) -> Vec<StepPlan> {
        vec![StepPlan::run(
            "Install dependencies",
            ctx.package_manager().install_command(),
        )]
    }
}

/// Installs CocoaPods dependencies for iOS builds.
#[derive(Debug, Clone, Copy, Default)]
pub struct PodsContributor;

impl StepContributor for PodsContributor {
    fn id(&self) -> &'static str {
        "cocoapods"
    }

    fn phase(&self) -> StepPhase {
        StepPhase::Install
    }

    fn priority(&self) -> u8 {
        10
    }

    fn is_active(&self, ctx: &JobContext<'_>) -> bool {
        ctx.primary_build_for(Platform::Ios).is_some()
    }

    fn contribute(&self, _ctx: &JobContext<'_>) -> Vec<StepPlan> {
        vec![StepPlan::run("Install CocoaPods", "pod install").with_working_directory("ios")]
    }
}
