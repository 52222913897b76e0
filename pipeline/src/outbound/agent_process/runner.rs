//! Child-process workflow runner.
//!
//! The agent runtime is an external command that owns the language model
//! conversation and the schema tool server. This adapter only handles process
//! lifecycle, the JSON protocol on stdin/stdout, and error mapping.

use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::protocol::{AgentResponseDto, WorkflowRequestDto};
use crate::domain::Workflow;
use crate::domain::WorkflowOutputs;
use crate::domain::ports::{WorkflowRunner, WorkflowRunnerError};
use crate::outbound::tool_server::ToolServerLaunch;

/// Exit status an agent uses to report that the tool server never came up
/// (`EX_UNAVAILABLE` from `sysexits.h`).
pub const TOOL_SERVER_UNAVAILABLE_EXIT_CODE: i32 = 69;

const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(900);
const PREVIEW_CHAR_LIMIT: usize = 160;

/// Workflow runner that delegates each run to an agent-runtime process.
#[derive(Debug, Clone)]
pub struct AgentProcessRunner {
    program: String,
    args: Vec<String>,
    tool_server: ToolServerLaunch,
    timeout: Duration,
}

impl AgentProcessRunner {
    /// Build a runner for `program args...`.
    pub fn new(
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
        tool_server: ToolServerLaunch,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            tool_server,
            timeout: DEFAULT_RUN_TIMEOUT,
        }
    }

    /// Override the per-run deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn command_label(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(self.tool_server.environment())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl WorkflowRunner for AgentProcessRunner {
    async fn run(&self, workflow: &Workflow) -> Result<WorkflowOutputs, WorkflowRunnerError> {
        let payload = serde_json::to_vec(&WorkflowRequestDto::from_workflow(workflow))
            .map_err(|error| WorkflowRunnerError::invalid_request(error.to_string()))?;

        debug!(
            run_id = %workflow.run_id(),
            entity = workflow.entity(),
            command = %self.command_label(),
            "starting agent runtime"
        );
        let mut child = self.command().spawn().map_err(|error| {
            WorkflowRunnerError::tool_server_unavailable(format!(
                "failed to start `{}`: {error}",
                self.command_label()
            ))
        })?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| WorkflowRunnerError::transport("agent stdin was not captured"))?;

        let write = async move {
            stdin.write_all(&payload).await?;
            stdin.shutdown().await
        };
        let exchange = async { tokio::join!(write, child.wait_with_output()) };
        let (write_result, output) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                WorkflowRunnerError::timeout(format!(
                    "`{}` did not finish within {}s",
                    self.command_label(),
                    self.timeout.as_secs()
                ))
            })?;
        let output = output.map_err(|error| WorkflowRunnerError::transport(error.to_string()))?;

        if !output.status.success() {
            let message = format!(
                "`{}` exited with {}: {}",
                self.command_label(),
                output.status,
                preview(&output.stderr)
            );
            return Err(match output.status.code() {
                Some(TOOL_SERVER_UNAVAILABLE_EXIT_CODE) => {
                    WorkflowRunnerError::tool_server_unavailable(message)
                }
                _ => WorkflowRunnerError::transport(message),
            });
        }
        if let Some(error) = write_result
            .err()
            .filter(|error| error.kind() != ErrorKind::BrokenPipe)
        {
            return Err(WorkflowRunnerError::transport(format!(
                "failed to send workflow to agent: {error}"
            )));
        }

        parse_response(&output.stdout)
    }
}

fn parse_response(stdout: &[u8]) -> Result<WorkflowOutputs, WorkflowRunnerError> {
    let decoded: AgentResponseDto = serde_json::from_slice(stdout).map_err(|error| {
        WorkflowRunnerError::decode(format!(
            "invalid agent response ({error}): {}",
            preview(stdout)
        ))
    })?;
    Ok(decoded.into_outputs())
}

fn preview(bytes: &[u8]) -> String {
    let compact = String::from_utf8_lossy(bytes)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let head = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
