//! Pipeline behaviour, output locations, and agent runtime launch settings.

use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::Deserialize;

use super::{ConfigError, required};

const DEFAULT_RETRY_COUNT: u32 = 3;
const DEFAULT_OUTPUT_RAW_DIR: &str = "output";
const DEFAULT_OUTPUT_TASKS_DIR: &str = "output/tasks";
const DEFAULT_CONSOLIDATED_FILE: &str = "output/consolidated.json";
const DEFAULT_TOOL_SERVER_COMMAND: &str = "dotnet";
const DEFAULT_TOOL_SERVER_CONNECT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_AGENT_RUN_TIMEOUT_SECS: u64 = 900;

/// Which [`WorkflowRunner`](crate::domain::ports::WorkflowRunner) adapter to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunnerKind {
    /// Spawn an external agent runtime process per workflow.
    #[default]
    Process,
    /// Call a chat-completions endpoint directly.
    Chat,
}

/// Settings controlling how the pipeline runs and where it writes.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "PIPELINE")]
pub struct PipelineSettings {
    /// Maximum attempts per entity.
    pub retry_count: Option<u32>,
    /// Directory for raw schema outputs.
    pub output_raw_dir: Option<String>,
    /// Directory for analysis task results.
    pub output_tasks_dir: Option<String>,
    /// Path of the consolidated document.
    pub consolidated_file: Option<String>,
    /// Runner adapter, `process` or `chat`.
    pub runner: Option<String>,
    /// Agent runtime executable for the process runner.
    pub agent_command: Option<String>,
    /// Whitespace-separated arguments for the agent runtime.
    pub agent_args: Option<String>,
    /// Seconds one agent runtime process may run before it is killed.
    pub agent_run_timeout_secs: Option<u64>,
    /// Executable that hosts the schema tool server.
    pub tool_server_command: Option<String>,
    /// Path of the tool server assembly passed to the command.
    pub tool_server_path: Option<String>,
    /// Seconds a runner may wait for the tool server to initialise.
    pub tool_server_connect_timeout_secs: Option<u64>,
    /// Comma-separated tool names advertised by the tool server.
    pub tools: Option<String>,
}

impl PipelineSettings {
    /// Attempts per entity, three unless configured.
    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.retry_count.unwrap_or(DEFAULT_RETRY_COUNT)
    }

    /// Raw output directory.
    #[must_use]
    pub fn output_raw_dir(&self) -> Utf8PathBuf {
        path_or(self.output_raw_dir.as_deref(), DEFAULT_OUTPUT_RAW_DIR)
    }

    /// Task output directory.
    #[must_use]
    pub fn output_tasks_dir(&self) -> Utf8PathBuf {
        path_or(self.output_tasks_dir.as_deref(), DEFAULT_OUTPUT_TASKS_DIR)
    }

    /// Consolidated document path.
    #[must_use]
    pub fn consolidated_file(&self) -> Utf8PathBuf {
        path_or(self.consolidated_file.as_deref(), DEFAULT_CONSOLIDATED_FILE)
    }

    /// Selected runner adapter.
    pub fn runner(&self) -> Result<RunnerKind, ConfigError> {
        match self.runner.as_deref().map(str::trim) {
            None | Some("") => Ok(RunnerKind::default()),
            Some(value) if value.eq_ignore_ascii_case("process") => Ok(RunnerKind::Process),
            Some(value) if value.eq_ignore_ascii_case("chat") => Ok(RunnerKind::Chat),
            Some(other) => Err(ConfigError::Invalid {
                key: "PIPELINE_RUNNER",
                message: format!("expected `process` or `chat`, got `{other}`"),
            }),
        }
    }

    /// Agent runtime executable, required by the process runner.
    pub fn agent_command(&self) -> Result<&str, ConfigError> {
        required(self.agent_command.as_deref(), "PIPELINE_AGENT_COMMAND")
    }

    /// Agent runtime arguments.
    #[must_use]
    pub fn agent_args(&self) -> Vec<String> {
        self.agent_args
            .as_deref()
            .map(|args| args.split_whitespace().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    /// Deadline for one agent runtime process, fifteen minutes unless
    /// configured.
    #[must_use]
    pub fn agent_run_timeout(&self) -> Duration {
        Duration::from_secs(
            self.agent_run_timeout_secs
                .unwrap_or(DEFAULT_AGENT_RUN_TIMEOUT_SECS),
        )
    }

    /// Tool server host executable.
    #[must_use]
    pub fn tool_server_command(&self) -> &str {
        self.tool_server_command
            .as_deref()
            .filter(|command| !command.trim().is_empty())
            .unwrap_or(DEFAULT_TOOL_SERVER_COMMAND)
    }

    /// Tool server assembly path, required by the process runner.
    pub fn tool_server_path(&self) -> Result<&str, ConfigError> {
        required(self.tool_server_path.as_deref(), "PIPELINE_TOOL_SERVER_PATH")
    }

    /// Tool server connect timeout, one minute unless configured.
    #[must_use]
    pub fn tool_server_connect_timeout(&self) -> Duration {
        Duration::from_secs(
            self.tool_server_connect_timeout_secs
                .unwrap_or(DEFAULT_TOOL_SERVER_CONNECT_TIMEOUT_SECS),
        )
    }

    /// Advertised tool names, in configured order.
    #[must_use]
    pub fn tools(&self) -> Vec<String> {
        self.tools
            .as_deref()
            .map(|tools| {
                tools
                    .split(',')
                    .map(str::trim)
                    .filter(|tool| !tool.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn path_or(value: Option<&str>, default: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(
        value
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .unwrap_or(default),
    )
}
