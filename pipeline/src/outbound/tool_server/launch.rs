//! How to start the schema tool server.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

/// Launch parameters for the schema tool server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolServerLaunch {
    /// Program that starts the tool server, e.g. `dotnet`.
    pub command: String,
    /// Arguments for `command`; exported as a JSON array.
    pub args: Vec<String>,
    /// Database connection string the tool server uses.
    pub connection_string: String,
    /// How long a client may wait for the tool server to accept calls.
    pub connect_timeout: Duration,
}

impl ToolServerLaunch {
    /// Launch a tool server project through `dotnet run`.
    pub fn dotnet_project(
        command: impl Into<String>,
        project_path: &str,
        connection_string: impl Into<String>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            args: vec![
                "run".to_owned(),
                "--project".to_owned(),
                project_path.to_owned(),
                "--no-build".to_owned(),
            ],
            connection_string: connection_string.into(),
            connect_timeout,
        }
    }

    /// Variables an agent runtime needs to start the tool server itself.
    pub(crate) fn environment(&self) -> [(&'static str, String); 4] {
        let args = serde_json::to_string(&self.args).unwrap_or_else(|_| "[]".to_owned());
        [
            ("CONNECTION_STRING", self.connection_string.clone()),
            ("TOOL_SERVER_COMMAND", self.command.clone()),
            ("TOOL_SERVER_ARGS", args),
            (
                "TOOL_SERVER_CONNECT_TIMEOUT",
                self.connect_timeout.as_secs().to_string(),
            ),
        ]
    }

    pub(super) fn label(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The server itself reads only the connection string; stderr is left
    /// to the operator's terminal.
    pub(super) fn command(&self) -> Command {
        let mut command = Command::new(&self.command);
        command
            .args(&self.args)
            .env("CONNECTION_STRING", &self.connection_string)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        command
    }
}
