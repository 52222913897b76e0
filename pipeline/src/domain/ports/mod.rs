//! Domain ports defining the edges of the hexagon.
//!
//! Ports describe how the domain reaches the agent runtime, the output
//! directory, and the tool server. Each fallible port exposes a typed error
//! so adapters map their failures into predictable variants.

mod macros;
pub(crate) use macros::define_port_error;

mod consolidated_document_writer;
mod entity_output_repository;
mod tool_catalogue;
mod workflow_runner;

#[cfg(test)]
pub use consolidated_document_writer::MockConsolidatedDocumentWriter;
pub use consolidated_document_writer::{
    ConsolidatedDocumentWriter, ConsolidatedDocumentWriterError,
    FixtureConsolidatedDocumentWriter,
};
#[cfg(test)]
pub use entity_output_repository::MockEntityOutputRepository;
pub use entity_output_repository::{
    EntityOutputRepository, EntityOutputRepositoryError, FixtureEntityOutputRepository,
};
#[cfg(test)]
pub use tool_catalogue::MockToolCatalogue;
pub use tool_catalogue::{FixtureToolCatalogue, ToolCatalogue};
#[cfg(test)]
pub use workflow_runner::MockWorkflowRunner;
pub use workflow_runner::{FixtureWorkflowRunner, WorkflowRunner, WorkflowRunnerError};
