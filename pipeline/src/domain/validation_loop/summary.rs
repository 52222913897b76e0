//! Human-readable summary of a validation loop.

use std::fmt;

use super::ValidationOutcome;

/// Attempt count, status, and both stage results of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionSummary {
    entity: String,
    attempts: u32,
    validation_passed: bool,
    producer_result: Option<String>,
    validator_result: String,
}

impl ExecutionSummary {
    /// Summarise `outcome` for `entity`.
    #[must_use]
    pub fn new(entity: impl Into<String>, outcome: &ValidationOutcome) -> Self {
        Self {
            entity: entity.into(),
            attempts: outcome.attempts,
            validation_passed: outcome.validation_passed,
            producer_result: outcome.producer_output.clone(),
            validator_result: outcome.validator_report.to_pretty_string(),
        }
    }

    /// Entity label.
    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Attempts made.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Whether the last attempt passed.
    #[must_use]
    pub const fn validation_passed(&self) -> bool {
        self.validation_passed
    }
}

impl fmt::Display for ExecutionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.validation_passed {
            "passed"
        } else {
            "failed"
        };
        writeln!(f, "Execution summary for {}", self.entity)?;
        writeln!(f, "Attempts: {}", self.attempts)?;
        writeln!(f, "Validation: {status}")?;
        writeln!(f, "Producer result:")?;
        writeln!(
            f,
            "{}",
            self.producer_result.as_deref().unwrap_or("<no output>")
        )?;
        writeln!(f, "Validator result:")?;
        write!(f, "{}", self.validator_result)
    }
}
