//! JSON-RPC 2.0 envelopes for the Model Context Protocol client side.
//!
//! Messages travel one per line. Only the methods the pipeline needs are
//! modelled: `initialize`, `notifications/initialized`, `tools/list`, and
//! `tools/call`.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub(super) const JSONRPC_VERSION: &str = "2.0";
pub(super) const PROTOCOL_VERSION: &str = "2024-11-05";
const CLIENT_NAME: &str = "schema-pipeline";

#[derive(Debug, Serialize)]
pub(super) struct JsonRpcRequest<'a> {
    pub(super) jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) id: Option<u64>,
    pub(super) method: &'a str,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub(super) params: Value,
}

impl<'a> JsonRpcRequest<'a> {
    pub(super) const fn call(id: u64, method: &'a str, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: Some(id),
            method,
            params,
        }
    }

    pub(super) const fn notification(method: &'a str) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: None,
            method,
            params: Value::Null,
        }
    }
}

/// Anything the server writes; requests and notifications from the server
/// carry a `method` and are skipped by the client.
#[derive(Debug, Deserialize)]
pub(super) struct JsonRpcMessage {
    #[serde(default)]
    pub(super) id: Option<Value>,
    #[serde(default)]
    pub(super) method: Option<String>,
    #[serde(default)]
    pub(super) result: Option<Value>,
    #[serde(default)]
    pub(super) error: Option<JsonRpcError>,
}

impl JsonRpcMessage {
    pub(super) fn answers(&self, id: u64) -> bool {
        self.method.is_none() && self.id.as_ref().and_then(Value::as_u64) == Some(id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct JsonRpcError {
    pub(super) code: i64,
    pub(super) message: String,
}

pub(super) fn initialize_params() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": CLIENT_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

/// A tool advertised by `tools/list`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolDefinition {
    /// Name used in `tools/call`.
    pub name: String,
    /// Human-readable purpose.
    #[serde(default)]
    pub description: String,
    /// JSON Schema of the call arguments.
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Value,
}

#[derive(Debug, Deserialize)]
pub(super) struct ToolsListResult {
    #[serde(default)]
    pub(super) tools: Vec<ToolDefinition>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ToolCallResult {
    #[serde(default)]
    pub(super) content: Vec<ContentBlock>,
    #[serde(rename = "isError", default)]
    pub(super) is_error: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct ContentBlock {
    #[serde(rename = "type")]
    pub(super) kind: String,
    #[serde(default)]
    pub(super) text: Option<String>,
}

impl ToolCallResult {
    /// Text blocks joined by newlines; other block kinds are dropped.
    pub(super) fn text(&self) -> String {
        self.content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
