//! A live stdio connection to the schema tool server.

use std::fmt;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tracing::debug;

use super::launch::ToolServerLaunch;
use super::protocol::{
    JsonRpcError, JsonRpcMessage, JsonRpcRequest, ToolCallResult, ToolDefinition,
    ToolsListResult, initialize_params,
};
use crate::domain::ports::WorkflowRunnerError;

/// What a tool answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolReply {
    /// Text content returned by the tool.
    pub text: String,
    /// Whether the tool or the server reported a failure.
    pub is_error: bool,
}

/// An initialised tool server process.
///
/// The child is killed when the session is dropped.
pub struct ToolSession {
    label: String,
    _child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    tools: Vec<ToolDefinition>,
    call_timeout: Duration,
}

enum RpcFailure {
    Transport(String),
    Remote(JsonRpcError),
}

impl fmt::Display for RpcFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(detail) => f.write_str(detail),
            Self::Remote(error) => write!(f, "{} (code {})", error.message, error.code),
        }
    }
}

impl ToolSession {
    /// Start the tool server, complete the initialisation handshake, and
    /// fetch its tool list.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRunnerError::ToolServerUnavailable`] when the
    /// server cannot be started or does not initialise within the launch's
    /// connect timeout.
    pub async fn connect(
        launch: &ToolServerLaunch,
        call_timeout: Duration,
    ) -> Result<Self, WorkflowRunnerError> {
        let label = launch.label();
        let mut child = launch
            .command()
            .spawn()
            .map_err(|error| unavailable(&label, &format!("failed to start: {error}")))?;
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(unavailable(&label, "stdio was not captured"));
        };
        let mut session = Self {
            label,
            _child: child,
            stdin,
            lines: BufReader::new(stdout).lines(),
            next_id: 1,
            tools: Vec::new(),
            call_timeout,
        };

        match tokio::time::timeout(launch.connect_timeout, session.handshake()).await {
            Ok(Ok(())) => {
                debug!(
                    server = %session.label,
                    tools = session.tools.len(),
                    "tool server initialised"
                );
                Ok(session)
            }
            Ok(Err(failure)) => Err(unavailable(
                &session.label,
                &format!("failed to initialise: {failure}"),
            )),
            Err(_) => Err(unavailable(
                &session.label,
                &format!("did not initialise within {:?}", launch.connect_timeout),
            )),
        }
    }

    /// Tools advertised during the handshake.
    #[must_use]
    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Invoke `name` with `arguments`.
    ///
    /// JSON-RPC errors come back as a [`ToolReply`] flagged as an error so
    /// the caller can relay them to the model.
    ///
    /// # Errors
    ///
    /// Returns a timeout when the call outlives the session's call timeout,
    /// a decode error for a malformed result, and
    /// [`WorkflowRunnerError::ToolServerUnavailable`] when the server has
    /// gone away.
    pub async fn call_tool(
        &mut self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolReply, WorkflowRunnerError> {
        debug!(server = %self.label, tool = name, "calling tool");
        let params = json!({ "name": name, "arguments": arguments });
        let outcome = tokio::time::timeout(self.call_timeout, self.request("tools/call", params))
            .await
            .map_err(|_| {
                WorkflowRunnerError::timeout(format!(
                    "tool `{name}` did not answer within {:?}",
                    self.call_timeout
                ))
            })?;
        match outcome {
            Ok(result) => {
                let decoded: ToolCallResult = serde_json::from_value(result).map_err(|error| {
                    WorkflowRunnerError::decode(format!("invalid result from tool `{name}`: {error}"))
                })?;
                Ok(ToolReply {
                    text: decoded.text(),
                    is_error: decoded.is_error,
                })
            }
            Err(failure @ RpcFailure::Remote(_)) => Ok(ToolReply {
                text: failure.to_string(),
                is_error: true,
            }),
            Err(RpcFailure::Transport(detail)) => Err(unavailable(&self.label, &detail)),
        }
    }

    async fn handshake(&mut self) -> Result<(), RpcFailure> {
        self.request("initialize", initialize_params()).await?;
        self.send(&JsonRpcRequest::notification("notifications/initialized"))
            .await?;
        let listed = self.request("tools/list", json!({})).await?;
        let decoded: ToolsListResult = serde_json::from_value(listed).map_err(|error| {
            RpcFailure::Transport(format!("invalid tools/list result: {error}"))
        })?;
        self.tools = decoded.tools;
        Ok(())
    }

    async fn request(&mut self, method: &str, params: Value) -> Result<Value, RpcFailure> {
        let id = self.next_id;
        self.next_id = id.wrapping_add(1);
        self.send(&JsonRpcRequest::call(id, method, params)).await?;

        loop {
            let line = self
                .lines
                .next_line()
                .await
                .map_err(|error| RpcFailure::Transport(error.to_string()))?
                .ok_or_else(|| RpcFailure::Transport("server closed its output".to_owned()))?;
            let Ok(message) = serde_json::from_str::<JsonRpcMessage>(&line) else {
                debug!(server = %self.label, %line, "skipping non-JSON-RPC output");
                continue;
            };
            if !message.answers(id) {
                continue;
            }
            return match message.error {
                Some(error) => Err(RpcFailure::Remote(error)),
                None => Ok(message.result.unwrap_or(Value::Null)),
            };
        }
    }

    async fn send(&mut self, message: &JsonRpcRequest<'_>) -> Result<(), RpcFailure> {
        let mut line = serde_json::to_vec(message)
            .map_err(|error| RpcFailure::Transport(error.to_string()))?;
        line.push(b'\n');
        self.stdin
            .write_all(&line)
            .await
            .map_err(|error| RpcFailure::Transport(format!("failed to write request: {error}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|error| RpcFailure::Transport(format!("failed to write request: {error}")))
    }
}

fn unavailable(label: &str, detail: &str) -> WorkflowRunnerError {
    WorkflowRunnerError::tool_server_unavailable(format!("`{label}` {detail}"))
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
