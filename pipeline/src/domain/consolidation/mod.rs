//! Merge per-entity output files into one schema document.
//!
//! The consolidator is tolerant of bad inputs: any single file that cannot be
//! classified, read, or parsed is skipped with a warning. Only a failure to
//! list the input directory aborts the run.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::ports::{
    ConsolidatedDocumentWriter, ConsolidatedDocumentWriterError, EntityOutputRepository,
    EntityOutputRepositoryError,
};

mod bucket;
mod document;

pub use bucket::Bucket;
use document::DocumentBuilder;
pub use document::{ConsolidatedDocument, ForeignKeyKey};

/// Why a `.json` file did not contribute to the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The name matches no section.
    Unclassified,
    /// The file could not be read.
    Unreadable {
        /// Repository error message.
        message: String,
    },
    /// The contents are not valid JSON.
    InvalidJson {
        /// Parser error message.
        message: String,
    },
    /// The JSON is neither an object nor an array.
    UnsupportedPayload,
}

impl SkipReason {
    /// Short label for structured log fields.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Unclassified => "unclassified",
            Self::Unreadable { .. } => "unreadable",
            Self::InvalidJson { .. } => "invalid_json",
            Self::UnsupportedPayload => "unsupported_payload",
        }
    }
}

/// One file left out of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    /// File name relative to the input directory.
    pub file: String,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// Result of one consolidation run.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidationReport {
    /// The merged document.
    pub document: ConsolidatedDocument,
    /// Files that contributed records, in processing order.
    pub merged: Vec<String>,
    /// Files that were skipped, in processing order.
    pub skipped: Vec<SkippedFile>,
    /// Foreign-key records dropped as duplicates.
    pub duplicate_foreign_keys: usize,
    /// Foreign-key records dropped because they were not JSON objects.
    pub discarded_foreign_keys: usize,
}

/// Errors that abort consolidation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsolidationError {
    /// The input directory could not be listed.
    #[error("failed to list entity outputs: {0}")]
    Listing(#[source] EntityOutputRepositoryError),
    /// The merged document could not be written.
    #[error("failed to write consolidated document: {0}")]
    Write(#[source] ConsolidatedDocumentWriterError),
}

/// Domain service merging entity files into a [`ConsolidatedDocument`].
pub struct SchemaConsolidator {
    repository: Arc<dyn EntityOutputRepository>,
    writer: Arc<dyn ConsolidatedDocumentWriter>,
    excluded_file: Option<String>,
}

impl SchemaConsolidator {
    /// Build a consolidator over `repository` that writes through `writer`.
    pub fn new(
        repository: Arc<dyn EntityOutputRepository>,
        writer: Arc<dyn ConsolidatedDocumentWriter>,
    ) -> Self {
        Self {
            repository,
            writer,
            excluded_file: None,
        }
    }

    /// Never read `file_name` as input, typically the document's own file
    /// when it lives inside the input directory.
    #[must_use]
    pub fn excluding(mut self, file_name: impl Into<String>) -> Self {
        self.excluded_file = Some(file_name.into());
        self
    }

    /// Merge every classifiable entity file into a document.
    pub async fn consolidate(&self) -> Result<ConsolidationReport, ConsolidationError> {
        let mut files = self
            .repository
            .list_entity_files()
            .await
            .map_err(ConsolidationError::Listing)?;
        files.sort();

        let mut builder = DocumentBuilder::default();
        let mut merged = Vec::new();
        let mut skipped = Vec::new();

        for file in files {
            if !file.ends_with(".json") || self.excluded_file.as_deref() == Some(file.as_str()) {
                continue;
            }
            match self.load(&file).await {
                Ok((bucket, records)) => {
                    builder.extend(&file, bucket, records);
                    merged.push(file);
                }
                Err(reason) => {
                    warn!(file = %file, reason = reason.label(), ?reason, "skipping entity file");
                    skipped.push(SkippedFile { file, reason });
                }
            }
        }

        let (document, tally) = builder.finish();
        info!(
            merged = merged.len(),
            skipped = skipped.len(),
            foreign_keys = document.foreign_keys.len(),
            columns = document.columns.len(),
            tables = document.tables.len(),
            duplicate_foreign_keys = tally.duplicates,
            discarded_foreign_keys = tally.discarded,
            "consolidated entity outputs"
        );
        Ok(ConsolidationReport {
            document,
            merged,
            skipped,
            duplicate_foreign_keys: tally.duplicates,
            discarded_foreign_keys: tally.discarded,
        })
    }

    /// Consolidate, then persist the document through the writer port.
    pub async fn consolidate_and_write(&self) -> Result<ConsolidationReport, ConsolidationError> {
        let report = self.consolidate().await?;
        self.writer
            .write_document(&report.document)
            .await
            .map_err(ConsolidationError::Write)?;
        Ok(report)
    }

    async fn load(&self, file: &str) -> Result<(Bucket, Vec<Value>), SkipReason> {
        let bucket = Bucket::classify(file).ok_or(SkipReason::Unclassified)?;
        let contents = self
            .repository
            .read_entity_file(file)
            .await
            .map_err(|err| SkipReason::Unreadable {
                message: err.to_string(),
            })?;
        let payload: Value =
            serde_json::from_str(&contents).map_err(|err| SkipReason::InvalidJson {
                message: err.to_string(),
            })?;
        let records = match payload {
            Value::Array(items) => items,
            object @ Value::Object(_) => vec![object],
            _ => return Err(SkipReason::UnsupportedPayload),
        };
        Ok((bucket, records))
    }
}
