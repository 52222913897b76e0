//! Domain model and services for validated schema extraction.
//!
//! Purpose: describe producer/validator workflows, run them through a bounded
//! retry-with-feedback loop, and merge validated entity files into a single
//! schema document. Adapters reach the domain only through [`ports`].

pub mod consolidation;
pub mod pipeline;
pub mod ports;
pub mod schema;
pub mod stages;
pub mod validation_loop;
pub mod validator_report;
pub mod workflow;

pub use self::consolidation::{
    Bucket, ConsolidatedDocument, ConsolidationError, ConsolidationReport, ForeignKeyKey,
    SchemaConsolidator, SkipReason, SkippedFile,
};
pub use self::pipeline::{
    EntityOutcome, EntitySkipReason, EntityStatus, ExtractionPipeline, PipelineError,
    PipelineStores, StageReport, TABLES_FILE, TASKS_FILE, load_task_list,
};
pub use self::schema::{
    AnalysisTaskResult, ColumnRecord, EntityKind, ForeignKeyRecord, ShapeError, TableRef,
};
pub use self::stages::{OutputArea, Stage, StageCatalogue};
pub use self::validation_loop::{
    ExecutionSummary, ValidationLoop, ValidationLoopError, ValidationOutcome,
};
pub use self::validator_report::{Issue, ReportSource, ValidatorReport, extract_first_json_object};
pub use self::workflow::{
    RawStageOutput, StageOutput, StageRole, StageSpec, Workflow, WorkflowOutputs,
    WorkflowTemplate,
};
