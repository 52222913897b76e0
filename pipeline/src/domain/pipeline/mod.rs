//! Sequential, entity-by-entity extraction pipeline.
//!
//! Every entity runs through the validation loop. Its producer payload is
//! persisted only when the final attempt passed validation and the payload
//! has the shape the stage promises; anything else is recorded as a skip.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::ports::{EntityOutputRepository, EntityOutputRepositoryError};
use crate::domain::schema::TableRef;
use crate::domain::stages::{OutputArea, Stage, StageCatalogue};
use crate::domain::validation_loop::{
    ExecutionSummary, ValidationLoop, ValidationLoopError, ValidationOutcome,
};

mod report;

pub use report::{EntityOutcome, EntitySkipReason, EntityStatus, StageReport};

/// Entity file holding the table inventory.
pub const TABLES_FILE: &str = "tables.json";
/// Entity file holding the analysis task list.
pub const TASKS_FILE: &str = "tasks.json";

/// Errors that abort a stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// The runner failed on the final attempt of an entity.
    #[error(transparent)]
    Validation(#[from] ValidationLoopError),
    /// A validated payload could not be written.
    #[error("failed to persist entity output: {0}")]
    Persist(#[source] EntityOutputRepositoryError),
    /// A stage input file could not be read or understood.
    #[error("stage input {file} is unavailable: {message}")]
    InputUnavailable {
        /// Input file name.
        file: String,
        /// Read or parse failure.
        message: String,
    },
}

/// Stores the pipeline writes validated payloads to.
#[derive(Clone)]
pub struct PipelineStores {
    /// Raw schema outputs, the consolidator's input.
    pub raw: Arc<dyn EntityOutputRepository>,
    /// Analysis task results.
    pub tasks: Arc<dyn EntityOutputRepository>,
}

/// Domain service running extraction stages.
pub struct ExtractionPipeline {
    validation_loop: ValidationLoop,
    catalogue: StageCatalogue,
    stores: PipelineStores,
}

impl ExtractionPipeline {
    /// Build a pipeline from its collaborators.
    pub fn new(
        validation_loop: ValidationLoop,
        catalogue: StageCatalogue,
        stores: PipelineStores,
    ) -> Self {
        Self {
            validation_loop,
            catalogue,
            stores,
        }
    }

    /// Extract the table inventory into `tables.json`.
    pub async fn extract_tables(&self) -> Result<StageReport, PipelineError> {
        self.run_stages(vec![Stage::TableInventory]).await
    }

    /// Extract the columns of every table into `<table>_schema.json`.
    pub async fn extract_columns(&self, tables: &[TableRef]) -> Result<StageReport, PipelineError> {
        self.run_stages(
            tables
                .iter()
                .map(|table| Stage::Columns {
                    table: table.clone(),
                })
                .collect(),
        )
        .await
    }

    /// Extract the foreign keys of every table into
    /// `<table>_relationships.json`.
    pub async fn extract_relationships(
        &self,
        tables: &[TableRef],
    ) -> Result<StageReport, PipelineError> {
        self.run_stages(
            tables
                .iter()
                .map(|table| Stage::Relationships {
                    table: table.clone(),
                })
                .collect(),
        )
        .await
    }

    /// Execute each analysis task into `task_<n>.json`, numbering from 1.
    pub async fn run_analysis_tasks(&self, tasks: &[String]) -> Result<StageReport, PipelineError> {
        self.run_stages(
            tasks
                .iter()
                .enumerate()
                .map(|(index, description)| Stage::AnalysisTask {
                    number: index + 1,
                    description: description.clone(),
                })
                .collect(),
        )
        .await
    }

    /// Read the validated table inventory back from the raw store.
    pub async fn load_tables(&self) -> Result<Vec<TableRef>, PipelineError> {
        load_json(self.stores.raw.as_ref(), TABLES_FILE).await
    }

    /// Run a single stage and persist its payload when it validates.
    pub async fn run_stage(&self, stage: &Stage) -> Result<EntityOutcome, PipelineError> {
        let template = self.catalogue.template(stage);
        let outcome = self.validation_loop.run(&template).await?;
        let summary = ExecutionSummary::new(template.entity(), &outcome);
        debug!(entity = template.entity(), "{summary}");

        let file_name = stage.file_name();
        let status = match accepted_payload(stage, &outcome) {
            Ok(payload) => {
                self.store_for(stage)
                    .write_entity(&file_name, &payload)
                    .await
                    .map_err(PipelineError::Persist)?;
                info!(
                    entity = template.entity(),
                    file = %file_name,
                    attempts = outcome.attempts,
                    "saved entity output"
                );
                EntityStatus::Persisted
            }
            Err(reason) => {
                warn!(
                    entity = template.entity(),
                    file = %file_name,
                    attempts = outcome.attempts,
                    reason = reason.label(),
                    ?reason,
                    "entity output not saved"
                );
                EntityStatus::Skipped(reason)
            }
        };

        Ok(EntityOutcome {
            stage: stage.clone(),
            file_name,
            status,
            summary,
        })
    }

    async fn run_stages(&self, stages: Vec<Stage>) -> Result<StageReport, PipelineError> {
        let mut outcomes = Vec::with_capacity(stages.len());
        for stage in &stages {
            outcomes.push(self.run_stage(stage).await?);
        }
        let report = StageReport::new(outcomes);
        info!(
            persisted = report.persisted_count(),
            skipped = report.skipped_count(),
            "stage finished"
        );
        Ok(report)
    }

    fn store_for(&self, stage: &Stage) -> &dyn EntityOutputRepository {
        match stage.output_area() {
            OutputArea::Raw => self.stores.raw.as_ref(),
            OutputArea::Tasks => self.stores.tasks.as_ref(),
        }
    }
}

/// Read the analysis task list (a JSON array of strings) from `store`.
pub async fn load_task_list(
    store: &dyn EntityOutputRepository,
    file: &str,
) -> Result<Vec<String>, PipelineError> {
    load_json(store, file).await
}

async fn load_json<T>(store: &dyn EntityOutputRepository, file: &str) -> Result<T, PipelineError>
where
    T: serde::de::DeserializeOwned,
{
    let unavailable = |message: String| PipelineError::InputUnavailable {
        file: file.to_owned(),
        message,
    };
    let contents = store
        .read_entity_file(file)
        .await
        .map_err(|err| unavailable(err.to_string()))?;
    serde_json::from_str(&contents).map_err(|err| unavailable(err.to_string()))
}

fn accepted_payload(stage: &Stage, outcome: &ValidationOutcome) -> Result<Value, EntitySkipReason> {
    if !outcome.validation_passed {
        return Err(EntitySkipReason::ValidationFailed);
    }
    let text = outcome
        .producer_output
        .as_deref()
        .ok_or(EntitySkipReason::MissingProducerOutput)?;
    let payload: Value =
        serde_json::from_str(strip_code_fence(text)).map_err(|err| {
            EntitySkipReason::MalformedOutput {
                message: err.to_string(),
            }
        })?;
    stage
        .entity_kind()
        .validate_shape(&payload)
        .map_err(|err| EntitySkipReason::MalformedOutput {
            message: err.to_string(),
        })?;
    Ok(payload)
}

/// Remove a surrounding Markdown code fence, with or without a language tag.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
        .map_or(trimmed, |body| {
            body.trim_start_matches(|ch: char| ch.is_ascii_alphabetic())
                .trim()
        })
}
