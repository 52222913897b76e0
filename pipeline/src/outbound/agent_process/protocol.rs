//! Stdin/stdout protocol spoken with the agent-runtime process.
//!
//! The runner writes one [`WorkflowRequestDto`] as JSON on stdin and expects
//! one [`AgentResponseDto`] on stdout:
//!
//! ```json
//! {"stages": [{"role": "producer", "output": "..."},
//!             {"role": "validator", "output": {"validation_passed": true}}]}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::{RawStageOutput, StageOutput, StageRole, StageSpec, Workflow, WorkflowOutputs};

#[derive(Debug, Serialize)]
pub(super) struct WorkflowRequestDto<'a> {
    pub(super) run_id: Uuid,
    pub(super) entity: &'a str,
    pub(super) stages: [StageRequestDto<'a>; 2],
}

#[derive(Debug, Serialize)]
pub(super) struct StageRequestDto<'a> {
    pub(super) role: StageRole,
    pub(super) name: &'a str,
    pub(super) instructions: &'a str,
    pub(super) expected_output: &'a str,
}

impl<'a> WorkflowRequestDto<'a> {
    pub(super) fn from_workflow(workflow: &'a Workflow) -> Self {
        let [producer, validator] = workflow.stages();
        Self {
            run_id: workflow.run_id(),
            entity: workflow.entity(),
            stages: [
                StageRequestDto::from_spec(producer),
                StageRequestDto::from_spec(validator),
            ],
        }
    }
}

impl<'a> StageRequestDto<'a> {
    fn from_spec(spec: &'a StageSpec) -> Self {
        Self {
            role: spec.role,
            name: &spec.name,
            instructions: &spec.instructions,
            expected_output: &spec.expected_output,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct AgentResponseDto {
    pub(super) stages: Vec<AgentStageDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AgentStageDto {
    pub(super) role: StageRole,
    #[serde(default)]
    pub(super) output: Value,
}

impl AgentResponseDto {
    pub(super) fn into_outputs(self) -> WorkflowOutputs {
        WorkflowOutputs::new(
            self.stages
                .into_iter()
                .map(AgentStageDto::into_stage_output)
                .collect(),
        )
    }
}

impl AgentStageDto {
    fn into_stage_output(self) -> StageOutput {
        let output = match self.output {
            Value::String(text) => RawStageOutput::Text(text),
            Value::Null => RawStageOutput::Text(String::new()),
            other => RawStageOutput::Structured(other),
        };
        StageOutput {
            role: self.role,
            output,
        }
    }
}
