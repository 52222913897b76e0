//! Directory-backed [`EntityOutputRepository`].

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs::Dir};
use serde_json::Value;

use super::atomic_io::{plain_file_name, write_atomic};
use crate::domain::ports::{EntityOutputRepository, EntityOutputRepositoryError};

/// Entity files stored as plain files in one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesystemEntityStore {
    root: Utf8PathBuf,
}

impl FilesystemEntityStore {
    /// Store rooted at `root`; the directory is created on first write.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the entity files.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn open(&self) -> std::io::Result<Dir> {
        Dir::open_ambient_dir(&self.root, ambient_authority())
    }
}

#[async_trait]
impl EntityOutputRepository for FilesystemEntityStore {
    async fn list_entity_files(&self) -> Result<Vec<String>, EntityOutputRepositoryError> {
        let listing = |err: std::io::Error| {
            EntityOutputRepositoryError::listing(format!("{}: {err}", self.root))
        };
        let dir = self.open().map_err(listing)?;
        let mut names = Vec::new();
        for entry in dir.entries().map_err(listing)? {
            let entry = entry.map_err(listing)?;
            if !entry.file_type().map_err(listing)?.is_file() {
                continue;
            }
            // Names that are not UTF-8 cannot be entity files.
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        Ok(names)
    }

    async fn read_entity_file(&self, file: &str) -> Result<String, EntityOutputRepositoryError> {
        let read = |err: std::io::Error| EntityOutputRepositoryError::read(file, err.to_string());
        let name = plain_file_name(file).map_err(read)?;
        self.open()
            .and_then(|dir| dir.read_to_string(name))
            .map_err(read)
    }

    async fn write_entity(
        &self,
        file: &str,
        payload: &Value,
    ) -> Result<(), EntityOutputRepositoryError> {
        let write = |message: String| EntityOutputRepositoryError::write(file, message);
        let contents = serde_json::to_string_pretty(payload).map_err(|err| write(err.to_string()))?;
        Dir::create_ambient_dir_all(&self.root, ambient_authority())
            .and_then(|()| self.open())
            .and_then(|dir| write_atomic(&dir, file, &contents))
            .map_err(|err| write(err.to_string()))
    }
}
