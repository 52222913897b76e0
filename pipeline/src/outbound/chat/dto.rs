//! Wire types for the chat-completions API.
//!
//! Requests borrow the running conversation; responses decode only the
//! first choice.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};

use crate::outbound::tool_server::ToolDefinition;

pub(super) const TEMPERATURE: f32 = 0.0;
pub(super) const TOP_P: f32 = 0.05;
pub(super) const MAX_TOKENS: u32 = 4000;

#[derive(Debug, Serialize)]
pub(super) struct ChatRequestDto<'a> {
    pub(super) messages: &'a [ChatMessageDto],
    pub(super) temperature: f32,
    pub(super) top_p: f32,
    pub(super) max_tokens: u32,
    pub(super) frequency_penalty: f32,
    pub(super) presence_penalty: f32,
    #[serde(skip_serializing_if = "no_tools")]
    pub(super) tools: &'a [ToolDto],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) response_format: Option<ResponseFormatDto>,
}

impl<'a> ChatRequestDto<'a> {
    pub(super) const fn new(
        messages: &'a [ChatMessageDto],
        tools: &'a [ToolDto],
        json_object: bool,
    ) -> Self {
        Self {
            messages,
            temperature: TEMPERATURE,
            top_p: TOP_P,
            max_tokens: MAX_TOKENS,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            tools,
            response_format: if json_object {
                Some(ResponseFormatDto::JSON_OBJECT)
            } else {
                None
            },
        }
    }
}

const fn no_tools(tools: &&[ToolDto]) -> bool {
    tools.is_empty()
}

/// One conversation turn. Assistant turns that request tools carry
/// `tool_calls`; the answers go back as `tool` turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(super) struct ChatMessageDto {
    pub(super) role: &'static str,
    pub(super) content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(super) tool_calls: Vec<ToolCallDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) tool_call_id: Option<String>,
}

impl ChatMessageDto {
    fn plain(role: &'static str, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub(super) fn system(content: impl Into<String>) -> Self {
        Self::plain("system", content)
    }

    pub(super) fn user(content: impl Into<String>) -> Self {
        Self::plain("user", content)
    }

    pub(super) fn assistant(reply: AssistantMessageDto) -> Self {
        Self {
            role: "assistant",
            content: reply.content,
            tool_calls: reply.tool_calls,
            tool_call_id: None,
        }
    }

    pub(super) fn tool(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            ..Self::plain("tool", content)
        }
    }
}

/// A function tool offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(super) struct ToolDto {
    #[serde(rename = "type")]
    pub(super) kind: &'static str,
    pub(super) function: FunctionDefinitionDto,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(super) struct FunctionDefinitionDto {
    pub(super) name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub(super) description: String,
    pub(super) parameters: Value,
}

impl From<&ToolDefinition> for ToolDto {
    /// Tools without an input schema take no arguments.
    fn from(tool: &ToolDefinition) -> Self {
        let parameters = if tool.input_schema.is_object() {
            tool.input_schema.clone()
        } else {
            json!({ "type": "object", "properties": {} })
        };
        Self {
            kind: "function",
            function: FunctionDefinitionDto {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters,
            },
        }
    }
}

/// A tool invocation requested by the model, echoed back verbatim in the
/// assistant turn that follows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(super) struct ToolCallDto {
    pub(super) id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub(super) kind: String,
    pub(super) function: FunctionCallDto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(super) struct FunctionCallDto {
    pub(super) name: String,
    /// JSON-encoded arguments, as produced by the model.
    #[serde(default)]
    pub(super) arguments: String,
}

fn function_kind() -> String {
    "function".to_owned()
}

#[derive(Debug, Serialize)]
pub(super) struct ResponseFormatDto {
    #[serde(rename = "type")]
    pub(super) format_type: &'static str,
}

impl ResponseFormatDto {
    pub(super) const JSON_OBJECT: Self = Self {
        format_type: "json_object",
    };
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatResponseDto {
    #[serde(default)]
    pub(super) choices: Vec<ChatChoiceDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatChoiceDto {
    pub(super) message: AssistantMessageDto,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub(super) struct AssistantMessageDto {
    #[serde(default)]
    pub(super) content: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub(super) tool_calls: Vec<ToolCallDto>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<ToolCallDto>, D::Error> {
    Ok(Option::<Vec<ToolCallDto>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ChatResponseDto {
    pub(super) fn into_first_message(self) -> Result<AssistantMessageDto, String> {
        self.choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| "response contained no choices".to_owned())
    }
}
