//! Retry-with-feedback orchestration of producer/validator workflows.
//!
//! Each attempt instantiates a fresh workflow from the template. When the
//! validator rejects the producer's output, the next attempt carries that
//! report (and only that report) as corrective feedback.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::ports::{WorkflowRunner, WorkflowRunnerError};
use crate::domain::validator_report::ValidatorReport;
use crate::domain::workflow::{StageRole, WorkflowOutputs, WorkflowTemplate};

mod summary;

pub use summary::ExecutionSummary;

/// Final state of one validation loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    /// Report of the last attempt that produced outputs.
    pub validator_report: ValidatorReport,
    /// Normalised producer output of that attempt, if it had one.
    pub producer_output: Option<String>,
    /// Whether the last report passed.
    pub validation_passed: bool,
    /// Number of attempts made, between 1 and the configured maximum.
    pub attempts: u32,
}

/// Errors that abort a validation loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationLoopError {
    /// The runner failed on the final attempt.
    #[error("workflow for {entity} failed on attempt {attempt}: {source}")]
    Runner {
        /// Entity the workflow extracts.
        entity: String,
        /// Attempt number that failed.
        attempt: u32,
        /// Runner failure.
        #[source]
        source: WorkflowRunnerError,
    },
}

/// Bounded retry loop over a [`WorkflowRunner`].
#[derive(Clone)]
pub struct ValidationLoop {
    runner: Arc<dyn WorkflowRunner>,
    max_attempts: u32,
}

impl ValidationLoop {
    /// Build a loop making at most `max_attempts` runs; zero is treated as one.
    #[must_use]
    pub fn new(runner: Arc<dyn WorkflowRunner>, max_attempts: u32) -> Self {
        Self {
            runner,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Effective attempt limit.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `template` until the validator passes or attempts run out.
    ///
    /// Exhausting the attempts is not an error; the outcome then reports
    /// `validation_passed == false`. A runner failure is retried unless it
    /// happens on the final attempt.
    pub async fn run(
        &self,
        template: &WorkflowTemplate,
    ) -> Result<ValidationOutcome, ValidationLoopError> {
        let entity = template.entity();
        let max_attempts = self.max_attempts;
        let mut latest: Option<(ValidatorReport, Option<String>)> = None;

        for attempt in 1..=max_attempts {
            let workflow = template.instantiate(latest.as_ref().map(|(report, _)| report));
            debug!(
                entity,
                attempt,
                max_attempts,
                run_id = %workflow.run_id(),
                with_feedback = latest.is_some(),
                "running workflow"
            );

            match self.runner.run(&workflow).await {
                Ok(outputs) => {
                    let (report, producer_output) = collect(&outputs);
                    if report.validation_passed() {
                        info!(entity, attempt, max_attempts, "validation passed");
                        return Ok(ValidationOutcome {
                            validator_report: report,
                            producer_output,
                            validation_passed: true,
                            attempts: attempt,
                        });
                    }
                    warn!(
                        entity,
                        attempt,
                        max_attempts,
                        issues = report.issues().len(),
                        report = %report.to_feedback_string(),
                        "validation failed"
                    );
                    latest = Some((report, producer_output));
                }
                Err(error) if attempt < max_attempts => {
                    warn!(
                        entity,
                        attempt,
                        max_attempts,
                        kind = error.label(),
                        error = %error,
                        "workflow run failed; retrying"
                    );
                }
                Err(source) => {
                    return Err(ValidationLoopError::Runner {
                        entity: entity.to_owned(),
                        attempt,
                        source,
                    });
                }
            }
        }

        warn!(entity, max_attempts, "validation attempts exhausted");
        let (validator_report, producer_output) =
            latest.unwrap_or_else(|| (ValidatorReport::missing(), None));
        Ok(ValidationOutcome {
            validator_report,
            producer_output,
            validation_passed: false,
            attempts: max_attempts,
        })
    }
}

fn collect(outputs: &WorkflowOutputs) -> (ValidatorReport, Option<String>) {
    let report = outputs
        .normalized_for(StageRole::Validator)
        .map_or_else(ValidatorReport::missing, |text| ValidatorReport::parse(&text));
    (report, outputs.normalized_for(StageRole::Producer))
}
