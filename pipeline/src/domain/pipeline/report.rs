//! Per-entity and per-stage results of the extraction pipeline.

use crate::domain::stages::Stage;
use crate::domain::validation_loop::ExecutionSummary;

/// Why a validated entity was not written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntitySkipReason {
    /// The final attempt did not pass validation.
    ValidationFailed,
    /// Validation passed but the producer emitted nothing.
    MissingProducerOutput,
    /// The producer output is not JSON of the expected shape.
    MalformedOutput {
        /// Parse or shape failure.
        message: String,
    },
}

impl EntitySkipReason {
    /// Short label for structured log fields.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::ValidationFailed => "validation_failed",
            Self::MissingProducerOutput => "missing_producer_output",
            Self::MalformedOutput { .. } => "malformed_output",
        }
    }
}

/// Whether an entity file was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityStatus {
    /// The payload was written.
    Persisted,
    /// The payload was not written.
    Skipped(EntitySkipReason),
}

/// Result of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityOutcome {
    /// Stage that ran.
    pub stage: Stage,
    /// Entity file name, whether or not it was written.
    pub file_name: String,
    /// Persist or skip.
    pub status: EntityStatus,
    /// Attempt count and stage results.
    pub summary: ExecutionSummary,
}

impl EntityOutcome {
    /// Whether the entity file was written.
    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        matches!(self.status, EntityStatus::Persisted)
    }
}

/// Aggregated outcomes of one stage, in processing order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StageReport {
    outcomes: Vec<EntityOutcome>,
}

impl StageReport {
    /// Wrap outcomes.
    #[must_use]
    pub const fn new(outcomes: Vec<EntityOutcome>) -> Self {
        Self { outcomes }
    }

    /// All outcomes.
    #[must_use]
    pub fn outcomes(&self) -> &[EntityOutcome] {
        &self.outcomes
    }

    /// Number of entity files written.
    #[must_use]
    pub fn persisted_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_persisted()).count()
    }

    /// Number of entities skipped.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.outcomes.len() - self.persisted_count()
    }
}
