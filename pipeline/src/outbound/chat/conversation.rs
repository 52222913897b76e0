//! The tool-calling loop behind each chat stage.
//!
//! The model may answer with `tool_calls` instead of content. Each call is
//! dispatched to the tool server, its answer appended as a `tool` turn, and
//! the conversation re-sent until the model answers in content or the round
//! limit is reached.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use super::dto::{
    AssistantMessageDto, ChatMessageDto, ChatRequestDto, FunctionCallDto, ToolDto,
};
use crate::domain::ports::WorkflowRunnerError;
use crate::outbound::tool_server::{ToolDefinition, ToolReply, ToolSession};

/// Completions requested before a stage gives up on a final answer.
pub(super) const MAX_TOOL_ROUNDS: usize = 10;

/// One chat-completions round trip.
#[async_trait]
pub(super) trait Completions: Sync {
    async fn complete(
        &self,
        request: &ChatRequestDto<'_>,
    ) -> Result<AssistantMessageDto, WorkflowRunnerError>;
}

/// Where tool calls are dispatched.
#[async_trait]
pub(super) trait ToolInvoker: Send {
    fn definitions(&self) -> &[ToolDefinition];

    async fn invoke(
        &mut self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolReply, WorkflowRunnerError>;
}

#[async_trait]
impl ToolInvoker for ToolSession {
    fn definitions(&self) -> &[ToolDefinition] {
        self.tools()
    }

    async fn invoke(
        &mut self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolReply, WorkflowRunnerError> {
        self.call_tool(name, arguments).await
    }
}

/// Run `messages` to a final answer, dispatching tool calls on the way.
pub(super) async fn converse<C, T>(
    completions: &C,
    tools: &mut T,
    mut messages: Vec<ChatMessageDto>,
    json_object: bool,
) -> Result<String, WorkflowRunnerError>
where
    C: Completions + ?Sized,
    T: ToolInvoker + ?Sized,
{
    let offered: Vec<ToolDto> = tools.definitions().iter().map(ToolDto::from).collect();
    for round in 1..=MAX_TOOL_ROUNDS {
        let reply = completions
            .complete(&ChatRequestDto::new(&messages, &offered, json_object))
            .await?;
        if reply.tool_calls.is_empty() {
            return Ok(reply.content.unwrap_or_default());
        }

        debug!(round, calls = reply.tool_calls.len(), "model requested tools");
        let calls = reply.tool_calls.clone();
        messages.push(ChatMessageDto::assistant(reply));
        for call in calls {
            let answer = answer_call(tools, &call.function).await?;
            messages.push(ChatMessageDto::tool(call.id, answer));
        }
    }
    Err(WorkflowRunnerError::decode(format!(
        "model was still requesting tools after {MAX_TOOL_ROUNDS} rounds"
    )))
}

/// The text sent back for one tool call. Mistakes the model can correct
/// are reported to it rather than raised.
async fn answer_call<T>(
    tools: &mut T,
    call: &FunctionCallDto,
) -> Result<String, WorkflowRunnerError>
where
    T: ToolInvoker + ?Sized,
{
    if !tools.definitions().iter().any(|tool| tool.name == call.name) {
        return Ok(format!("error: unknown tool `{}`", call.name));
    }
    let arguments = match parse_arguments(&call.arguments) {
        Ok(arguments) => arguments,
        Err(error) => {
            return Ok(format!(
                "error: arguments for `{}` are not a JSON object: {error}",
                call.name
            ));
        }
    };
    let reply = tools.invoke(&call.name, arguments).await?;
    Ok(if reply.is_error {
        format!("error: {}", reply.text)
    } else {
        reply.text
    })
}

fn parse_arguments(raw: &str) -> Result<Value, String> {
    if raw.trim().is_empty() {
        return Ok(json!({}));
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(other) => Err(format!("got {other}")),
        Err(error) => Err(error.to_string()),
    }
}

#[cfg(test)]
#[path = "conversation_tests.rs"]
mod tests;
