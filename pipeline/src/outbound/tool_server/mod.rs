//! Schema tool server plumbing shared by the workflow runners.
//!
//! The tool server is a Model Context Protocol server spoken to over stdio.
//! The agent-process runner only forwards its launch parameters; the chat
//! runner drives a [`ToolSession`] itself.

mod launch;
mod protocol;
mod session;

pub use launch::ToolServerLaunch;
pub use protocol::ToolDefinition;
pub use session::{ToolReply, ToolSession};
