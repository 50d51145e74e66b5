//! Plan invariant checks
//!
//! Plans built from validated configurations always pass; a failure here is
//! an internal defect, not a user error.

use super::{JobPlan, WorkflowPlan};
use miette::Diagnostic;
use std::collections::HashSet;
use thiserror::Error;

/// A violated plan invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum PlanDefect {
    /// The plan has no jobs
    #[error("workflow has no jobs")]
    #[diagnostic(code(rnflow::plan::no_jobs))]
    NoJobs,

    /// Two jobs share an id
    #[error("duplicate job id '{job}'")]
    #[diagnostic(code(rnflow::plan::duplicate_job))]
    DuplicateJob {
        /// The repeated id
        job: String,
    },

    /// A job id is empty or contains characters outside `[A-Za-z0-9_-]`
    #[error("invalid job id '{job}'")]
    #[diagnostic(code(rnflow::plan::invalid_job_id))]
    InvalidJobId {
        /// The offending id
        job: String,
    },

    /// A job has no steps
    #[error("job '{job}' has no steps")]
    #[diagnostic(code(rnflow::plan::empty_job))]
    EmptyJob {
        /// Job id
        job: String,
    },

    /// A job depends on a job that is not defined before it
    #[error("job '{job}' needs '{dependency}', which is not an earlier job")]
    #[diagnostic(code(rnflow::plan::unknown_dependency))]
    UnknownDependency {
        /// Dependent job
        job: String,
        /// Missing dependency
        dependency: String,
    },

    /// A step has an empty action reference or script
    #[error("step '{step}' in job '{job}' has no action")]
    #[diagnostic(code(rnflow::plan::empty_action))]
    EmptyAction {
        /// Job id
        job: String,
        /// Step name
        step: String,
    },
}

/// Validator for plan invariants
pub struct PlanValidator<'a> {
    plan: &'a WorkflowPlan,
}

impl<'a> PlanValidator<'a> {
    /// Create a new validator for the given plan
    #[must_use]
    pub const fn new(plan: &'a WorkflowPlan) -> Self {
        Self { plan }
    }

    /// Validate the entire plan
    ///
    /// # Errors
    ///
    /// Returns every violated invariant.
    pub fn validate(&self) -> Result<(), Vec<PlanDefect>> {
        let mut errors = Vec::new();

        if self.plan.jobs.is_empty() {
            errors.push(PlanDefect::NoJobs);
        }

        let mut earlier: HashSet<&str> = HashSet::new();
        for job in &self.plan.jobs {
            if !is_valid_job_id(&job.id) {
                errors.push(PlanDefect::InvalidJobId {
                    job: job.id.clone(),
                });
            }

            // needs must point backwards, which also rules out cycles
            for dependency in &job.needs {
                if !earlier.contains(dependency.as_str()) {
                    errors.push(PlanDefect::UnknownDependency {
                        job: job.id.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }

            if !earlier.insert(&job.id) {
                errors.push(PlanDefect::DuplicateJob {
                    job: job.id.clone(),
                });
            }

            Self::validate_steps(job, &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_steps(job: &JobPlan, errors: &mut Vec<PlanDefect>) {
        if job.steps.is_empty() {
            errors.push(PlanDefect::EmptyJob {
                job: job.id.clone(),
            });
        }
        for step in &job.steps {
            if step.action.as_str().trim().is_empty() {
                errors.push(PlanDefect::EmptyAction {
                    job: job.id.clone(),
                    step: step.name.clone(),
                });
            }
        }
    }
}

fn is_valid_job_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{RunnerKind, StepPlan};

    fn job(id: &str, needs: &[&str], steps: Vec<StepPlan>) -> JobPlan {
        JobPlan {
            id: id.to_string(),
            name: id.to_string(),
            runner: RunnerKind::Linux,
            needs: needs.iter().map(ToString::to_string).collect(),
            condition: None,
            environment: None,
            timeout_minutes: None,
            steps,
            notes: vec![],
        }
    }

    fn plan(jobs: Vec<JobPlan>) -> WorkflowPlan {
        WorkflowPlan {
            name: "test".into(),
            triggers: vec![],
            permissions: vec![],
            jobs,
            secrets: vec![],
        }
    }

    fn checkout() -> Vec<StepPlan> {
        vec![StepPlan::uses("Checkout", "actions/checkout@v4")]
    }

    #[test]
    fn test_valid_plan() {
        let plan = plan(vec![
            job("build", &[], checkout()),
            job("notify", &["build"], checkout()),
        ]);
        assert!(PlanValidator::new(&plan).validate().is_ok());
    }

    #[test]
    fn test_no_jobs() {
        let plan = plan(vec![]);
        assert_eq!(
            PlanValidator::new(&plan).validate().unwrap_err(),
            vec![PlanDefect::NoJobs]
        );
    }

    #[test]
    fn test_forward_dependency_rejected() {
        let plan = plan(vec![
            job("notify", &["build"], checkout()),
            job("build", &[], checkout()),
        ]);
        let errors = PlanValidator::new(&plan).validate().unwrap_err();
        assert_eq!(
            errors,
            vec![PlanDefect::UnknownDependency {
                job: "notify".into(),
                dependency: "build".into()
            }]
        );
    }

    #[test]
    fn test_collects_all_defects() {
        let plan = plan(vec![
            job("build", &[], vec![]),
            job("build", &[], vec![StepPlan::run("Nothing", "  ")]),
            job("bad id", &["build"], checkout()),
        ]);
        let errors = PlanValidator::new(&plan).validate().unwrap_err();
        assert_eq!(
            errors,
            vec![
                PlanDefect::EmptyJob {
                    job: "build".into()
                },
                PlanDefect::DuplicateJob {
                    job: "build".into()
                },
                PlanDefect::EmptyAction {
                    job: "build".into(),
                    step: "Nothing".into()
                },
                PlanDefect::InvalidJobId {
                    job: "bad id".into()
                },
            ]
        );
    }
}
