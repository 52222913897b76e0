//! Chat-completions outbound adapter.
//!
//! This module provides an HTTP implementation of the `WorkflowRunner` port
//! for Azure-style OpenAI deployments. Tool calls requested by the model are
//! served by the schema tool server.

mod conversation;
mod dto;
mod runner;

pub use runner::{ChatCompletionsRunner, ChatEndpoint, ChatRunnerBuildError};
