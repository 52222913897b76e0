//! Reqwest-backed chat-completions workflow runner.
//!
//! Each run starts the schema tool server and offers its tools to both
//! stages. The producer answers in free text. The validator sees the
//! producer output, may query the database itself, and answers through the
//! JSON-object response format.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::conversation::{Completions, converse};
use super::dto::{AssistantMessageDto, ChatMessageDto, ChatRequestDto, ChatResponseDto};
use crate::domain::ports::{WorkflowRunner, WorkflowRunnerError};
use crate::domain::{
    RawStageOutput, StageOutput, StageRole, StageSpec, Workflow, WorkflowOutputs,
};
use crate::outbound::tool_server::{ToolServerLaunch, ToolSession};

const API_KEY_HEADER: &str = "api-key";
const PRODUCER_CONTEXT_HEADER: &str = "Producer output to validate:";

/// Deployment coordinates of a chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct ChatEndpoint {
    /// Resource base URL, e.g. `https://example.openai.azure.com/`.
    pub api_base: Url,
    /// Deployment name placed in the request path.
    pub deployment: String,
    /// Value of the `api-version` query parameter.
    pub api_version: String,
    /// Key sent in the `api-key` header.
    pub api_key: String,
}

/// Errors raised while constructing a [`ChatCompletionsRunner`].
#[derive(Debug, Error)]
pub enum ChatRunnerBuildError {
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    /// The base URL cannot carry path segments.
    #[error("api base `{base}` cannot be used as a base URL")]
    Endpoint {
        /// Rejected base URL.
        base: String,
    },
}

/// Workflow runner that talks to a chat-completions deployment directly.
pub struct ChatCompletionsRunner {
    client: Client,
    endpoint: Url,
    api_key: String,
    tool_server: ToolServerLaunch,
    timeout: Duration,
}

impl ChatCompletionsRunner {
    /// Build a runner with an explicit timeout, applied to each completion
    /// request and to each tool call.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed or the
    /// base URL cannot be extended with the deployment path.
    pub fn new(
        endpoint: ChatEndpoint,
        timeout: Duration,
        tool_server: ToolServerLaunch,
    ) -> Result<Self, ChatRunnerBuildError> {
        let client = Client::builder().timeout(timeout).build()?;
        let url = completions_url(&endpoint)?;
        Ok(Self {
            client,
            endpoint: url,
            api_key: endpoint.api_key,
            tool_server,
            timeout,
        })
    }

    /// Fully qualified completions URL, including the `api-version` query.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Completions for ChatCompletionsRunner {
    async fn complete(
        &self,
        request: &ChatRequestDto<'_>,
    ) -> Result<AssistantMessageDto, WorkflowRunnerError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        parse_completion(body.as_ref())
    }
}

#[async_trait]
impl WorkflowRunner for ChatCompletionsRunner {
    async fn run(&self, workflow: &Workflow) -> Result<WorkflowOutputs, WorkflowRunnerError> {
        let mut tools = ToolSession::connect(&self.tool_server, self.timeout).await?;

        debug!(
            run_id = %workflow.run_id(),
            entity = workflow.entity(),
            "running producer stage"
        );
        let producer_text =
            converse(self, &mut tools, producer_messages(workflow.producer()), false).await?;

        debug!(
            run_id = %workflow.run_id(),
            entity = workflow.entity(),
            "running validator stage"
        );
        let validator_text = converse(
            self,
            &mut tools,
            validator_messages(workflow.validator(), &producer_text),
            true,
        )
        .await?;

        Ok(WorkflowOutputs::new(vec![
            StageOutput {
                role: StageRole::Producer,
                output: RawStageOutput::Text(producer_text),
            },
            StageOutput {
                role: StageRole::Validator,
                output: structured_or_text(validator_text),
            },
        ]))
    }
}

fn completions_url(endpoint: &ChatEndpoint) -> Result<Url, ChatRunnerBuildError> {
    let mut url = endpoint.api_base.clone();
    url.path_segments_mut()
        .map_err(|()| ChatRunnerBuildError::Endpoint {
            base: endpoint.api_base.to_string(),
        })?
        .pop_if_empty()
        .extend([
            "openai",
            "deployments",
            endpoint.deployment.as_str(),
            "chat",
            "completions",
        ]);
    url.query_pairs_mut()
        .clear()
        .append_pair("api-version", &endpoint.api_version);
    Ok(url)
}

fn producer_messages(stage: &StageSpec) -> Vec<ChatMessageDto> {
    vec![
        ChatMessageDto::system(system_prompt(stage)),
        ChatMessageDto::user(stage.instructions.as_str()),
    ]
}

fn validator_messages(stage: &StageSpec, producer_output: &str) -> Vec<ChatMessageDto> {
    vec![
        ChatMessageDto::system(system_prompt(stage)),
        ChatMessageDto::user(validator_prompt(stage, producer_output)),
    ]
}

fn system_prompt(stage: &StageSpec) -> String {
    let mut prompt = format!(
        "You are {name}.\nExpected output: {expected}",
        name = stage.name,
        expected = stage.expected_output
    );
    if stage.role == StageRole::Validator {
        prompt.push_str("\nRespond with a single JSON object.");
    }
    prompt
}

fn validator_prompt(stage: &StageSpec, producer_output: &str) -> String {
    format!(
        "{instructions}\n\n{PRODUCER_CONTEXT_HEADER}\n{producer_output}",
        instructions = stage.instructions
    )
}

/// JSON-mode answers that parse become structured output.
fn structured_or_text(content: String) -> RawStageOutput {
    match serde_json::from_str::<Value>(&content) {
        Ok(value @ Value::Object(_)) => RawStageOutput::Structured(value),
        _ => RawStageOutput::Text(content),
    }
}

fn parse_completion(body: &[u8]) -> Result<AssistantMessageDto, WorkflowRunnerError> {
    let decoded: ChatResponseDto = serde_json::from_slice(body).map_err(|error| {
        WorkflowRunnerError::decode(format!("invalid chat completion payload: {error}"))
    })?;
    decoded
        .into_first_message()
        .map_err(WorkflowRunnerError::decode)
}

fn map_transport_error(error: reqwest::Error) -> WorkflowRunnerError {
    if error.is_timeout() {
        WorkflowRunnerError::timeout(error.to_string())
    } else {
        WorkflowRunnerError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> WorkflowRunnerError {
    let body_preview = body_preview(body);
    let message = if body_preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), body_preview)
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS => WorkflowRunnerError::rate_limited(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            WorkflowRunnerError::timeout(message)
        }
        _ if status.is_client_error() => WorkflowRunnerError::invalid_request(message),
        _ => WorkflowRunnerError::transport(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
