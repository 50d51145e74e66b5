//! Test, lint and static analysis steps.

use super::{JobContext, PackageManagerCommands, StepContributor, StepPhase};
use crate::config::Kind;
use crate::plan::StepPlan;

/// Runs the `test` script with coverage.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestContributor;

impl StepContributor for TestContributor {
    fn id(&self) -> &'static str {
        "test"
    }

    fn phase(&self) -> StepPhase {
        StepPhase::Kind
    }

    fn is_active(&self, ctx: &JobContext<'_>) -> bool {
        ctx.is_primary_of(Kind::Test)
    }

    fn contribute(&self, ctx: &JobContext<'_>) -> Vec<StepPlan> {
        vec![
            StepPlan::run("Run tests", ctx.package_manager().test_with("--coverage"))
                .with_env("CI", true),
        ]
    }
}

/// Runs the `lint` script.
#[derive(Debug, Clone, Copy, Default)]
pub struct LintContributor;

impl StepContributor for LintContributor {
    fn id(&self) -> &'static str {
        "lint"
    }

    fn phase(&self) -> StepPhase {
        StepPhase::Kind
    }

    fn is_active(&self, ctx: &JobContext<'_>) -> bool {
        ctx.is_primary_of(Kind::Lint)
    }

    fn contribute(&self, ctx: &JobContext<'_>) -> Vec<StepPlan> {
        vec![StepPlan::run("Lint", ctx.package_manager().run_script("lint"))]
    }
}

/// Lint, TypeScript and Prettier checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticAnalysisContributor;

impl StepContributor for StaticAnalysisContributor {
    fn id(&self) -> &'static str {
        "static-analysis"
    }

    fn phase(&self) -> StepPhase {
        StepPhase::Kind
    }

    fn is_active(&self, ctx: &JobContext<'_>) -> bool {
        ctx.is_primary_of(Kind::StaticAnalysis)
    }

    fn contribute(&self, ctx: &JobContext<'_>) -> Vec<StepPlan> {
        let pm = ctx.package_manager();
        vec![
            StepPlan::run("ESLint", pm.run_script("lint")),
            StepPlan::run("TypeScript", pm.exec("tsc --noEmit")),
            StepPlan::run("Prettier", pm.exec("prettier --check .")),
        ]
    }
}
