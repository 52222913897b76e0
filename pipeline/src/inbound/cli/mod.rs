//! Command-line inbound adapter.
//!
//! Parses the command line with clap and drives the domain services. Adapter
//! construction stays in the binary; handlers here only see domain types.

use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand, ValueEnum};
use thiserror::Error;
use tracing::info;

use crate::domain::ports::EntityOutputRepository;
use crate::domain::{
    ConsolidationError, ExtractionPipeline, PipelineError, SchemaConsolidator, load_task_list,
};

mod outcome;

pub use outcome::CommandOutcome;

/// `schema-pipeline` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "schema-pipeline",
    about = "Extract a validated relational schema through LLM agents and consolidate it",
    version
)]
pub struct Cli {
    /// Log output format.
    #[arg(
        long = "log-format",
        value_enum,
        default_value_t = LogFormat::Human,
        global = true
    )]
    pub log_format: LogFormat,
    /// Stage to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Log rendering selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Human,
    /// One JSON object per event.
    Json,
}

/// Pipeline stages exposed as subcommands.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Extract the table inventory.
    Tables,
    /// Extract the columns of every inventoried table.
    Columns,
    /// Extract the foreign keys of every inventoried table.
    Relationships,
    /// Execute the analysis tasks listed in a JSON array of strings.
    Analyze {
        /// Task list file; defaults to `tasks.json` in the raw output directory.
        #[arg(long = "tasks-file", value_name = "path")]
        tasks_file: Option<Utf8PathBuf>,
    },
    /// Merge entity files into the consolidated document.
    Consolidate {
        /// Directory holding entity files; defaults to the raw output directory.
        #[arg(long = "input-dir", value_name = "path")]
        input_dir: Option<Utf8PathBuf>,
        /// Consolidated document path; defaults to the configured file.
        #[arg(long = "output-file", value_name = "path")]
        output_file: Option<Utf8PathBuf>,
    },
    /// Run tables, columns, relationships, then consolidate.
    RunAll,
}

impl Command {
    /// Whether the command needs the agent runtime.
    #[must_use]
    pub const fn runs_workflows(&self) -> bool {
        !matches!(self, Self::Consolidate { .. })
    }
}

/// Location of the analysis task list.
#[derive(Clone)]
pub struct TaskListSource {
    /// Store the list is read from.
    pub store: Arc<dyn EntityOutputRepository>,
    /// File name within `store`.
    pub file: String,
}

/// Domain services a command runs against.
pub struct CommandServices {
    /// Extraction stages; absent when the command only consolidates.
    pub pipeline: Option<ExtractionPipeline>,
    /// Consolidation service.
    pub consolidator: SchemaConsolidator,
    /// Analysis task list location.
    pub task_list: TaskListSource,
}

/// Errors returned by command handlers.
#[derive(Debug, Error)]
pub enum CliError {
    /// An extraction stage aborted.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// Consolidation aborted.
    #[error(transparent)]
    Consolidation(#[from] ConsolidationError),
    /// A workflow command was wired without an extraction pipeline.
    #[error("command `{command}` requires the extraction pipeline")]
    PipelineUnavailable {
        /// Subcommand name.
        command: &'static str,
    },
}

/// Run `command` against `services`.
///
/// # Errors
///
/// Returns an error when a stage aborts; skipped entities are not errors and
/// are reported in the returned outcome.
pub async fn execute(
    command: &Command,
    services: &CommandServices,
) -> Result<CommandOutcome, CliError> {
    match command {
        Command::Tables => {
            let pipeline = pipeline(services, "tables")?;
            Ok(CommandOutcome::Stage(pipeline.extract_tables().await?))
        }
        Command::Columns => {
            let pipeline = pipeline(services, "columns")?;
            let tables = pipeline.load_tables().await?;
            Ok(CommandOutcome::Stage(pipeline.extract_columns(&tables).await?))
        }
        Command::Relationships => {
            let pipeline = pipeline(services, "relationships")?;
            let tables = pipeline.load_tables().await?;
            Ok(CommandOutcome::Stage(
                pipeline.extract_relationships(&tables).await?,
            ))
        }
        Command::Analyze { .. } => {
            let pipeline = pipeline(services, "analyze")?;
            let source = &services.task_list;
            let tasks = load_task_list(source.store.as_ref(), &source.file).await?;
            info!(tasks = tasks.len(), file = %source.file, "loaded analysis tasks");
            Ok(CommandOutcome::Stage(
                pipeline.run_analysis_tasks(&tasks).await?,
            ))
        }
        Command::Consolidate { .. } => Ok(CommandOutcome::Consolidated(
            services.consolidator.consolidate_and_write().await?,
        )),
        Command::RunAll => run_all(services).await,
    }
}

async fn run_all(services: &CommandServices) -> Result<CommandOutcome, CliError> {
    let pipeline = pipeline(services, "run-all")?;
    let tables_report = pipeline.extract_tables().await?;
    let tables = pipeline.load_tables().await?;
    let columns = pipeline.extract_columns(&tables).await?;
    let relationships = pipeline.extract_relationships(&tables).await?;
    let consolidation = services.consolidator.consolidate_and_write().await?;
    Ok(CommandOutcome::RunAll {
        tables: tables_report,
        columns,
        relationships,
        consolidation,
    })
}

fn pipeline<'a>(
    services: &'a CommandServices,
    command: &'static str,
) -> Result<&'a ExtractionPipeline, CliError> {
    services
        .pipeline
        .as_ref()
        .ok_or(CliError::PipelineUnavailable { command })
}
