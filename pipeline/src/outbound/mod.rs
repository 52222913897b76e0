//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **agent_process**: runs workflows through an external agent-runtime command
//! - **chat**: runs workflows directly against a chat-completions deployment
//! - **filesystem**: persists entity files and the consolidated document
//! - **tool_server**: launches and talks to the schema tool server
//!
//! Adapters are thin translators between domain types and their wire or disk
//! representations. They contain no business logic.

pub mod agent_process;
pub mod chat;
pub mod filesystem;
pub mod tool_server;
