//! Driven port for per-entity JSON output files.

use async_trait::async_trait;
use serde_json::Value;

use super::define_port_error;

define_port_error! {
    /// Errors raised while listing, reading, or writing entity files.
    pub enum EntityOutputRepositoryError {
        /// The output directory could not be opened or listed.
        Listing { message: String } => "entity output listing failed: {message}",
        /// A single entity file could not be read.
        Read { file: String, message: String } =>
            "entity file {file} could not be read: {message}",
        /// An entity file could not be written.
        Write { file: String, message: String } =>
            "entity file {file} could not be written: {message}",
    }
}

/// Port over the directory holding raw per-entity outputs.
///
/// File names are plain names relative to the store root, such as
/// `tables.json` or `Orders_schema.json`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntityOutputRepository: Send + Sync {
    /// List the file names in the store, in no particular order.
    async fn list_entity_files(&self) -> Result<Vec<String>, EntityOutputRepositoryError>;

    /// Read the raw contents of one file.
    async fn read_entity_file(&self, file: &str) -> Result<String, EntityOutputRepositoryError>;

    /// Persist `payload` as pretty-printed JSON under `file`.
    async fn write_entity(
        &self,
        file: &str,
        payload: &Value,
    ) -> Result<(), EntityOutputRepositoryError>;
}

/// Fixture repository with no files that discards writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureEntityOutputRepository;

#[async_trait]
impl EntityOutputRepository for FixtureEntityOutputRepository {
    async fn list_entity_files(&self) -> Result<Vec<String>, EntityOutputRepositoryError> {
        Ok(Vec::new())
    }

    async fn read_entity_file(&self, file: &str) -> Result<String, EntityOutputRepositoryError> {
        Err(EntityOutputRepositoryError::read(file, "fixture store holds no files"))
    }

    async fn write_entity(
        &self,
        _file: &str,
        _payload: &Value,
    ) -> Result<(), EntityOutputRepositoryError> {
        Ok(())
    }
}
