//! Records emitted by producer stages and persisted as entity files.
//!
//! Agents are loose about scalar types, so flag- and size-like fields are
//! kept as raw JSON values. Files are written from the producer's original
//! JSON, so these types only check shape; they never rewrite payloads.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One entry of `tables.json`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    /// Owning schema, e.g. `dbo`.
    pub schema: String,
    /// Table name.
    pub table: String,
}

impl TableRef {
    /// Build a reference from its parts.
    #[must_use]
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// One entry of a `<table>_schema.json` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRecord {
    /// Table the column belongs to.
    pub table_name: String,
    /// Column name.
    pub column_name: String,
    /// Declared SQL type.
    pub data_type: String,
    /// Maximum length, when the type has one.
    #[serde(default)]
    pub length: Value,
    /// Whether the column is part of the primary key.
    #[serde(default)]
    pub is_primary_key: Value,
    /// Whether the column accepts nulls.
    #[serde(default)]
    pub is_nullable: Value,
}

/// One entry of a `<table>_relationships.json` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRecord {
    /// Constraint name.
    #[serde(default)]
    pub name: Option<String>,
    /// Referencing table.
    pub table: String,
    /// Referencing column.
    pub column: String,
    /// Referenced table.
    pub ref_table: String,
    /// Referenced column.
    pub ref_column: String,
}

/// Contents of a `task_<n>.json` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisTaskResult {
    /// Task description as given.
    pub task: String,
    /// SQL the producer executed.
    pub query: String,
    /// Rows returned by the query.
    #[serde(default)]
    pub results: Value,
    /// Number of rows returned.
    #[serde(default)]
    pub row_count: Value,
}

/// Kind of entity a producer stage emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Array of [`TableRef`].
    TableInventory,
    /// One [`ColumnRecord`] or an array of them.
    Columns,
    /// One [`ForeignKeyRecord`] or an array of them.
    Relationships,
    /// One [`AnalysisTaskResult`].
    AnalysisTask,
}

/// Raised when a producer payload does not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("payload is not a valid {kind} document: {message}")]
pub struct ShapeError {
    /// Entity kind that was expected.
    pub kind: &'static str,
    /// Deserialisation failure.
    pub message: String,
}

impl EntityKind {
    /// Label used in logs and errors.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::TableInventory => "table inventory",
            Self::Columns => "columns",
            Self::Relationships => "relationships",
            Self::AnalysisTask => "analysis task",
        }
    }

    /// Check that `payload` deserialises into this kind's record type.
    ///
    /// The table inventory must be an array; per-table files may also hold
    /// a single record object.
    pub fn validate_shape(self, payload: &Value) -> Result<(), ShapeError> {
        let outcome = match self {
            Self::TableInventory => Vec::<TableRef>::deserialize(payload).map(drop),
            Self::Columns => OneOrMany::<ColumnRecord>::deserialize(payload).map(drop),
            Self::Relationships => OneOrMany::<ForeignKeyRecord>::deserialize(payload).map(drop),
            Self::AnalysisTask => AnalysisTaskResult::deserialize(payload).map(drop),
        };
        outcome.map_err(|err| ShapeError {
            kind: self.label(),
            message: err.to_string(),
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
