//! File-backed [`ConsolidatedDocumentWriter`].

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs::Dir};

use super::atomic_io::write_atomic;
use crate::domain::consolidation::ConsolidatedDocument;
use crate::domain::ports::{ConsolidatedDocumentWriter, ConsolidatedDocumentWriterError};

/// Writes the consolidated document to a fixed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesystemDocumentWriter {
    path: Utf8PathBuf,
}

impl FilesystemDocumentWriter {
    /// Writer targeting `path`; parent directories are created as needed.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Destination path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn split(&self) -> Result<(&Utf8Path, &str), ConsolidatedDocumentWriterError> {
        let file_name = self.path.file_name().ok_or_else(|| {
            ConsolidatedDocumentWriterError::io(format!("{} does not name a file", self.path))
        })?;
        let parent = self
            .path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        Ok((parent, file_name))
    }
}

#[async_trait]
impl ConsolidatedDocumentWriter for FilesystemDocumentWriter {
    async fn write_document(
        &self,
        document: &ConsolidatedDocument,
    ) -> Result<(), ConsolidatedDocumentWriterError> {
        let contents = document
            .to_pretty_json()
            .map_err(|err| ConsolidatedDocumentWriterError::serialization(err.to_string()))?;
        let (parent, file_name) = self.split()?;
        Dir::create_ambient_dir_all(parent, ambient_authority())
            .and_then(|()| Dir::open_ambient_dir(parent, ambient_authority()))
            .and_then(|dir| write_atomic(&dir, file_name, &contents))
            .map_err(|err| ConsolidatedDocumentWriterError::io(format!("{}: {err}", self.path)))
    }
}
