//! Agent-runtime process adapter.
//!
//! The default `WorkflowRunner`: each workflow is handed to an external agent
//! command that drives the language model and the schema tool server.

mod protocol;
mod runner;
mod tool_catalogue;

pub use runner::{AgentProcessRunner, TOOL_SERVER_UNAVAILABLE_EXIT_CODE};
pub use tool_catalogue::StaticToolCatalogue;
