//! `schema-pipeline` entry point: loads settings, wires adapters, and runs
//! one command.

use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use clap::Parser;
use ortho_config::OrthoConfig;
use tokio::runtime::Builder;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use schema_pipeline::config::{DatabaseSettings, LlmSettings, PipelineSettings, RunnerKind};
use schema_pipeline::domain::ports::{EntityOutputRepository, WorkflowRunner};
use schema_pipeline::domain::{
    ExtractionPipeline, PipelineStores, SchemaConsolidator, StageCatalogue, TASKS_FILE,
    ValidationLoop,
};
use schema_pipeline::inbound::cli::{
    self, Cli, Command, CommandServices, LogFormat, TaskListSource,
};
use schema_pipeline::outbound::agent_process::{AgentProcessRunner, StaticToolCatalogue};
use schema_pipeline::outbound::chat::{ChatCompletionsRunner, ChatEndpoint};
use schema_pipeline::outbound::filesystem::{FilesystemDocumentWriter, FilesystemEntityStore};
use schema_pipeline::outbound::tool_server::ToolServerLaunch;

const APP_NAME: &str = "schema-pipeline";

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let runtime = match Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(error = %err, "failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };
    match runtime.block_on(async_main(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "{APP_NAME} failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter);
    let result = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Human => builder.try_init(),
    };
    if let Err(err) = result {
        warn!(error = %err, "tracing init failed");
    }
}

async fn async_main(cli: Cli) -> io::Result<()> {
    let settings = PipelineSettings::load_from_iter([OsString::from(APP_NAME)])
        .map_err(|err| io::Error::other(format!("load pipeline settings: {err}")))?;

    let raw_store: Arc<dyn EntityOutputRepository> =
        Arc::new(FilesystemEntityStore::new(settings.output_raw_dir()));
    let pipeline = if cli.command.runs_workflows() {
        Some(build_pipeline(&settings, Arc::clone(&raw_store))?)
    } else {
        None
    };
    let services = CommandServices {
        pipeline,
        consolidator: build_consolidator(&cli.command, &settings),
        task_list: task_list_source(&cli.command, raw_store),
    };

    info!(command = ?cli.command, "running command");
    let outcome = cli::execute(&cli.command, &services)
        .await
        .map_err(io::Error::other)?;
    if !outcome.is_complete() {
        warn!("some entities failed validation and were not saved");
    }
    write!(io::stdout().lock(), "{outcome}")
}

fn build_pipeline(
    settings: &PipelineSettings,
    raw_store: Arc<dyn EntityOutputRepository>,
) -> io::Result<ExtractionPipeline> {
    let database = DatabaseSettings::load_from_iter([OsString::from(APP_NAME)])
        .map_err(|err| io::Error::other(format!("load database settings: {err}")))?;
    let launch = tool_server_launch(settings, &database)?;
    let runner: Arc<dyn WorkflowRunner> = match settings.runner().map_err(io::Error::other)? {
        RunnerKind::Process => Arc::new(process_runner(settings, launch)?),
        RunnerKind::Chat => Arc::new(chat_runner(launch)?),
    };

    let catalogue = StageCatalogue::from_tool_catalogue(
        database.database_name().map_err(io::Error::other)?,
        &StaticToolCatalogue::new(settings.tools()),
    );
    let stores = PipelineStores {
        raw: raw_store,
        tasks: Arc::new(FilesystemEntityStore::new(settings.output_tasks_dir())),
    };
    Ok(ExtractionPipeline::new(
        ValidationLoop::new(runner, settings.retry_count()),
        catalogue,
        stores,
    ))
}

fn tool_server_launch(
    settings: &PipelineSettings,
    database: &DatabaseSettings,
) -> io::Result<ToolServerLaunch> {
    Ok(ToolServerLaunch::dotnet_project(
        settings.tool_server_command(),
        settings.tool_server_path().map_err(io::Error::other)?,
        database
            .connection_string(false)
            .map_err(io::Error::other)?,
        settings.tool_server_connect_timeout(),
    ))
}

fn process_runner(
    settings: &PipelineSettings,
    launch: ToolServerLaunch,
) -> io::Result<AgentProcessRunner> {
    Ok(AgentProcessRunner::new(
        settings.agent_command().map_err(io::Error::other)?,
        settings.agent_args(),
        launch,
    )
    .with_timeout(settings.agent_run_timeout()))
}

fn chat_runner(launch: ToolServerLaunch) -> io::Result<ChatCompletionsRunner> {
    let llm = LlmSettings::load_from_iter([OsString::from(APP_NAME)])
        .map_err(|err| io::Error::other(format!("load LLM settings: {err}")))?;
    let endpoint = ChatEndpoint {
        api_base: llm.api_base().map_err(io::Error::other)?,
        deployment: llm.deployment().map_err(io::Error::other)?.to_owned(),
        api_version: llm.api_version().to_owned(),
        api_key: llm.api_key().map_err(io::Error::other)?.to_owned(),
    };
    ChatCompletionsRunner::new(endpoint, llm.request_timeout(), launch).map_err(io::Error::other)
}

fn build_consolidator(command: &Command, settings: &PipelineSettings) -> SchemaConsolidator {
    let (input_dir, output_file) = match command {
        Command::Consolidate {
            input_dir: input_override,
            output_file: output_override,
        } => (
            input_override
                .clone()
                .unwrap_or_else(|| settings.output_raw_dir()),
            output_override
                .clone()
                .unwrap_or_else(|| settings.consolidated_file()),
        ),
        _ => (settings.output_raw_dir(), settings.consolidated_file()),
    };

    let excluded = excluded_output_name(&input_dir, &output_file);
    let consolidator = SchemaConsolidator::new(
        Arc::new(FilesystemEntityStore::new(input_dir)),
        Arc::new(FilesystemDocumentWriter::new(output_file)),
    );
    match excluded {
        Some(file_name) => consolidator.excluding(file_name),
        None => consolidator,
    }
}

fn task_list_source(command: &Command, raw_store: Arc<dyn EntityOutputRepository>) -> TaskListSource {
    match command {
        Command::Analyze {
            tasks_file: Some(path),
        } => TaskListSource {
            store: Arc::new(FilesystemEntityStore::new(parent_dir(path).to_owned())),
            file: path.file_name().unwrap_or(TASKS_FILE).to_owned(),
        },
        _ => TaskListSource {
            store: raw_store,
            file: TASKS_FILE.to_owned(),
        },
    }
}

/// File name of `output_file` when it would land inside `input_dir`.
fn excluded_output_name(input_dir: &Utf8Path, output_file: &Utf8Path) -> Option<String> {
    output_file
        .file_name()
        .filter(|_| normalised(parent_dir(output_file)) == normalised(input_dir))
        .map(str::to_owned)
}

/// `path` without `.` components; empty results become `.`.
fn normalised(path: &Utf8Path) -> Utf8PathBuf {
    let kept: Utf8PathBuf = path
        .components()
        .filter(|component| *component != Utf8Component::CurDir)
        .collect();
    if kept.as_str().is_empty() {
        Utf8PathBuf::from(".")
    } else {
        kept
    }
}

fn parent_dir(path: &Utf8Path) -> &Utf8Path {
    match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    }
}
