//! Catalogue of extraction stages and their workflow templates.

use crate::domain::ports::ToolCatalogue;
use crate::domain::schema::{EntityKind, TableRef};
use crate::domain::workflow::WorkflowTemplate;

mod prompts;

use prompts::PromptContext;

const NO_TOOLS: &str = "the tools advertised by the schema tool server";

/// Output area an entity file is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputArea {
    /// Raw schema outputs that feed consolidation.
    Raw,
    /// Analysis task results.
    Tasks,
}

/// One unit of extraction work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Every schema and table of the database.
    TableInventory,
    /// Columns of one table.
    Columns {
        /// Table to describe.
        table: TableRef,
    },
    /// Foreign keys of one table.
    Relationships {
        /// Table to describe.
        table: TableRef,
    },
    /// One free-form analysis task, numbered from 1.
    AnalysisTask {
        /// Position of the task in the task list.
        number: usize,
        /// Task description as given.
        description: String,
    },
}

impl Stage {
    /// Kind of payload the producer must emit.
    #[must_use]
    pub const fn entity_kind(&self) -> EntityKind {
        match self {
            Self::TableInventory => EntityKind::TableInventory,
            Self::Columns { .. } => EntityKind::Columns,
            Self::Relationships { .. } => EntityKind::Relationships,
            Self::AnalysisTask { .. } => EntityKind::AnalysisTask,
        }
    }

    /// Label used in logs and summaries.
    #[must_use]
    pub fn entity_label(&self) -> String {
        match self {
            Self::TableInventory => "tables".to_owned(),
            Self::Columns { table } => format!("{table} columns"),
            Self::Relationships { table } => format!("{table} relationships"),
            Self::AnalysisTask { number, .. } => format!("task {number}"),
        }
    }

    /// Name of the entity file the validated payload is stored under.
    ///
    /// # Examples
    ///
    /// ```
    /// use schema_pipeline::domain::{Stage, TableRef};
    ///
    /// let stage = Stage::Columns { table: TableRef::new("dbo", "Orders") };
    /// assert_eq!(stage.file_name(), "Orders_schema.json");
    /// ```
    #[must_use]
    pub fn file_name(&self) -> String {
        match self {
            Self::TableInventory => "tables.json".to_owned(),
            Self::Columns { table } => format!("{}_schema.json", file_stem(&table.table)),
            Self::Relationships { table } => {
                format!("{}_relationships.json", file_stem(&table.table))
            }
            Self::AnalysisTask { number, .. } => format!("task_{number}.json"),
        }
    }

    /// Output area the entity file belongs to.
    #[must_use]
    pub const fn output_area(&self) -> OutputArea {
        match self {
            Self::AnalysisTask { .. } => OutputArea::Tasks,
            _ => OutputArea::Raw,
        }
    }
}

/// Replace characters that cannot appear in a plain file name.
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.' | ' ') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

/// Builds workflow templates for stages against one database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageCatalogue {
    database: String,
    tools: Vec<String>,
}

impl StageCatalogue {
    /// Build a catalogue for `database` advertising `tools` in prompts.
    #[must_use]
    pub fn new(database: impl Into<String>, tools: Vec<String>) -> Self {
        Self {
            database: database.into(),
            tools,
        }
    }

    /// Build a catalogue using the tools listed by `catalogue`.
    #[must_use]
    pub fn from_tool_catalogue(database: impl Into<String>, catalogue: &dyn ToolCatalogue) -> Self {
        Self::new(database, catalogue.list_tools())
    }

    /// Workflow template for `stage`.
    #[must_use]
    pub fn template(&self, stage: &Stage) -> WorkflowTemplate {
        let tools = if self.tools.is_empty() {
            NO_TOOLS.to_owned()
        } else {
            self.tools.join(", ")
        };
        let ctx = PromptContext {
            database: &self.database,
            tools: &tools,
        };
        let (producer, validator) = match stage {
            Stage::TableInventory => prompts::table_inventory(&ctx),
            Stage::Columns { table } => prompts::columns(&ctx, table),
            Stage::Relationships { table } => prompts::relationships(&ctx, table),
            Stage::AnalysisTask { description, .. } => prompts::analysis_task(&ctx, description),
        };
        WorkflowTemplate::new(stage.entity_label(), producer, validator)
    }
}
