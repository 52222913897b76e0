//! Driven port for executing a two-stage workflow through the agent runtime.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::workflow::{Workflow, WorkflowOutputs};

define_port_error! {
    /// Errors raised by agent runtime adapters.
    pub enum WorkflowRunnerError {
        /// Network or process transport failed before a response arrived.
        Transport { message: String } => "agent runtime transport failed: {message}",
        /// The runtime did not answer within its deadline.
        Timeout { message: String } => "agent runtime timed out: {message}",
        /// The language model provider throttled the request.
        RateLimited { message: String } => "agent runtime was rate limited: {message}",
        /// The runtime answered with a payload that could not be decoded.
        Decode { message: String } => "agent runtime response could not be decoded: {message}",
        /// The schema-introspection tool server could not be started or reached.
        ToolServerUnavailable { message: String } =>
            "schema tool server unavailable: {message}",
        /// The runtime rejected the workflow description.
        InvalidRequest { message: String } => "agent runtime rejected the workflow: {message}",
    }
}

/// Port that runs a producer stage followed by a validator stage.
///
/// Implementations return the outputs of every stage that ran, tagged with
/// the stage role, in execution order.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkflowRunner: Send + Sync {
    /// Execute `workflow` and collect its stage outputs.
    async fn run(&self, workflow: &Workflow) -> Result<WorkflowOutputs, WorkflowRunnerError>;
}

/// Fixture runner that replays a fixed pair of outputs for every workflow.
#[derive(Debug, Clone, Default)]
pub struct FixtureWorkflowRunner {
    outputs: WorkflowOutputs,
}

impl FixtureWorkflowRunner {
    /// Replay `outputs` on every call.
    #[must_use]
    pub const fn new(outputs: WorkflowOutputs) -> Self {
        Self { outputs }
    }
}

#[async_trait]
impl WorkflowRunner for FixtureWorkflowRunner {
    async fn run(&self, _workflow: &Workflow) -> Result<WorkflowOutputs, WorkflowRunnerError> {
        Ok(self.outputs.clone())
    }
}
