//! Two-stage producer/validator workflow descriptions.
//!
//! A [`WorkflowTemplate`] holds the base instructions for one entity. Each
//! attempt of the validation loop derives a fresh, immutable [`Workflow`]
//! from the template, optionally carrying the previous validator report as
//! corrective feedback. Stages are tagged with a [`StageRole`] when they are
//! built, so outputs are routed by role rather than by agent naming.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::validator_report::ValidatorReport;

const FEEDBACK_HEADER: &str = "Previous validation results:";
const FEEDBACK_DIRECTIVE: &str = "Use this feedback to improve the next query.";

/// Role a workflow stage plays in the extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageRole {
    /// Extracts information through the external tool collaborator.
    Producer,
    /// Re-checks the producer's claims against the live database.
    Validator,
}

impl StageRole {
    /// Stable lowercase name used on the wire and in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Producer => "producer",
            Self::Validator => "validator",
        }
    }
}

/// Immutable description of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpec {
    /// Role attached at construction time.
    pub role: StageRole,
    /// Human-readable agent persona, e.g. `Expert Database Analyst`.
    pub name: String,
    /// Task instructions handed to the agent.
    pub instructions: String,
    /// Short description of the output contract.
    pub expected_output: String,
}

impl StageSpec {
    /// Build a producer stage.
    pub fn producer(
        name: impl Into<String>,
        instructions: impl Into<String>,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            role: StageRole::Producer,
            name: name.into(),
            instructions: instructions.into(),
            expected_output: expected_output.into(),
        }
    }

    /// Build a validator stage.
    pub fn validator(
        name: impl Into<String>,
        instructions: impl Into<String>,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            role: StageRole::Validator,
            name: name.into(),
            instructions: instructions.into(),
            expected_output: expected_output.into(),
        }
    }
}

/// Base description of a producer/validator workflow for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowTemplate {
    entity: String,
    producer: StageSpec,
    validator: StageSpec,
}

impl WorkflowTemplate {
    /// Build a template from its two stages.
    ///
    /// # Examples
    ///
    /// ```
    /// use schema_pipeline::domain::{StageSpec, WorkflowTemplate};
    ///
    /// let template = WorkflowTemplate::new(
    ///     "tables",
    ///     StageSpec::producer("Analyst", "List all tables.", "JSON array"),
    ///     StageSpec::validator("Validator", "Check the list.", "JSON object"),
    /// );
    /// let workflow = template.instantiate(None);
    /// assert_eq!(workflow.producer().instructions, "List all tables.");
    /// ```
    #[must_use]
    pub fn new(entity: impl Into<String>, producer: StageSpec, validator: StageSpec) -> Self {
        Self {
            entity: entity.into(),
            producer: StageSpec {
                role: StageRole::Producer,
                ..producer
            },
            validator: StageSpec {
                role: StageRole::Validator,
                ..validator
            },
        }
    }

    /// Label of the entity this workflow extracts.
    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Producer stage with its base instructions.
    #[must_use]
    pub const fn producer(&self) -> &StageSpec {
        &self.producer
    }

    /// Validator stage.
    #[must_use]
    pub const fn validator(&self) -> &StageSpec {
        &self.validator
    }

    /// Derive a concrete workflow for one attempt.
    ///
    /// Feedback is appended to the base producer instructions, never to the
    /// instructions of an earlier attempt, so only one report is visible.
    #[must_use]
    pub fn instantiate(&self, feedback: Option<&ValidatorReport>) -> Workflow {
        let producer = match feedback {
            Some(report) => StageSpec {
                instructions: with_feedback(&self.producer.instructions, report),
                ..self.producer.clone()
            },
            None => self.producer.clone(),
        };

        Workflow {
            run_id: Uuid::new_v4(),
            entity: self.entity.clone(),
            producer,
            validator: self.validator.clone(),
        }
    }
}

fn with_feedback(base: &str, report: &ValidatorReport) -> String {
    format!(
        "{base}\n\n{FEEDBACK_HEADER}\n{feedback}\n{FEEDBACK_DIRECTIVE}",
        feedback = report.to_feedback_string()
    )
}

/// One concrete, immutable workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Workflow {
    run_id: Uuid,
    entity: String,
    producer: StageSpec,
    validator: StageSpec,
}

impl Workflow {
    /// Identifier used to correlate the run across logs and adapters.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Label of the entity being extracted.
    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Producer stage for this run.
    #[must_use]
    pub const fn producer(&self) -> &StageSpec {
        &self.producer
    }

    /// Validator stage for this run; it consumes the producer output.
    #[must_use]
    pub const fn validator(&self) -> &StageSpec {
        &self.validator
    }

    /// Stages in execution order.
    #[must_use]
    pub fn stages(&self) -> [&StageSpec; 2] {
        [&self.producer, &self.validator]
    }
}

/// Output of one stage as returned by the agent runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum RawStageOutput {
    /// Free-form text output.
    Text(String),
    /// Output the runtime already delivered as structured JSON.
    Structured(Value),
}

impl RawStageOutput {
    /// Normalise the output to a string.
    ///
    /// Structured output is serialised as compact JSON; text is trimmed.
    #[must_use]
    pub fn normalize(&self) -> String {
        match self {
            Self::Text(text) => text.trim().to_owned(),
            Self::Structured(value) => value.to_string(),
        }
    }

    /// Whether the output carries no content at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Structured(value) => value.is_null(),
        }
    }
}

/// Output of one stage tagged with its role.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutput {
    /// Role of the stage that produced the output.
    pub role: StageRole,
    /// Raw output.
    pub output: RawStageOutput,
}

/// Ordered stage outputs of one workflow run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkflowOutputs {
    outputs: Vec<StageOutput>,
}

impl WorkflowOutputs {
    /// Wrap stage outputs in execution order.
    #[must_use]
    pub const fn new(outputs: Vec<StageOutput>) -> Self {
        Self { outputs }
    }

    /// Convenience constructor for a producer/validator text pair.
    #[must_use]
    pub fn from_text(producer: impl Into<String>, validator: impl Into<String>) -> Self {
        Self::new(vec![
            StageOutput {
                role: StageRole::Producer,
                output: RawStageOutput::Text(producer.into()),
            },
            StageOutput {
                role: StageRole::Validator,
                output: RawStageOutput::Text(validator.into()),
            },
        ])
    }

    /// Normalised output of the last non-empty stage with `role`.
    #[must_use]
    pub fn normalized_for(&self, role: StageRole) -> Option<String> {
        self.outputs
            .iter()
            .rev()
            .filter(|stage| stage.role == role && !stage.output.is_empty())
            .map(|stage| stage.output.normalize())
            .next()
    }

    /// All stage outputs in execution order.
    #[must_use]
    pub fn as_slice(&self) -> &[StageOutput] {
        &self.outputs
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
