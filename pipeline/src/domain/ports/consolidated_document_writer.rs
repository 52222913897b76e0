//! Driven port for persisting the consolidated schema document.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::consolidation::ConsolidatedDocument;

define_port_error! {
    /// Errors raised while writing the consolidated document.
    pub enum ConsolidatedDocumentWriterError {
        /// The document could not be serialised.
        Serialization { message: String } =>
            "consolidated document serialisation failed: {message}",
        /// The destination could not be created or replaced.
        Io { message: String } => "consolidated document write failed: {message}",
    }
}

/// Port that stores the merged schema document.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConsolidatedDocumentWriter: Send + Sync {
    /// Write `document`, replacing any previous version.
    async fn write_document(
        &self,
        document: &ConsolidatedDocument,
    ) -> Result<(), ConsolidatedDocumentWriterError>;
}

/// Fixture writer that discards documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureConsolidatedDocumentWriter;

#[async_trait]
impl ConsolidatedDocumentWriter for FixtureConsolidatedDocumentWriter {
    async fn write_document(
        &self,
        _document: &ConsolidatedDocument,
    ) -> Result<(), ConsolidatedDocumentWriterError> {
        Ok(())
    }
}
