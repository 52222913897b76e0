//! The merged schema document and its foreign-key deduplication.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::Bucket;

const FOREIGN_KEY_FIELDS: [&str; 4] = ["table", "column", "ref_table", "ref_column"];

/// Single JSON artifact combining every per-entity output.
///
/// Sections serialise in the order `foreign_keys`, `columns`, `tables`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedDocument {
    /// Deduplicated foreign-key records.
    pub foreign_keys: Vec<Value>,
    /// Column records of every table, in file order.
    pub columns: Vec<Value>,
    /// Table inventory records.
    pub tables: Vec<Value>,
}

impl ConsolidatedDocument {
    /// Pretty JSON with two-space indentation.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Composite identity of a foreign-key record.
///
/// Absent fields compare as JSON `null`, so two records missing the same
/// field are still duplicates of each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForeignKeyKey([String; 4]);

impl ForeignKeyKey {
    /// Read the `(table, column, ref_table, ref_column)` key from `record`.
    ///
    /// Returns `None` when `record` is not a JSON object.
    #[must_use]
    pub fn from_record(record: &Value) -> Option<Self> {
        let fields = record.as_object()?;
        Some(Self(FOREIGN_KEY_FIELDS.map(|field| {
            fields.get(field).unwrap_or(&Value::Null).to_string()
        })))
    }
}

/// Foreign-key bookkeeping of one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(super) struct ForeignKeyTally {
    pub(super) duplicates: usize,
    pub(super) discarded: usize,
}

/// Incremental merge of entity payloads into a document.
#[derive(Debug, Default)]
pub(super) struct DocumentBuilder {
    document: ConsolidatedDocument,
    seen_foreign_keys: HashSet<ForeignKeyKey>,
    tally: ForeignKeyTally,
}

impl DocumentBuilder {
    pub(super) fn extend(&mut self, file: &str, bucket: Bucket, records: Vec<Value>) {
        match bucket {
            Bucket::ForeignKeys => records
                .into_iter()
                .for_each(|record| self.push_foreign_key(file, record)),
            Bucket::Columns => self.document.columns.extend(records),
            Bucket::Tables => self.document.tables.extend(records),
        }
    }

    fn push_foreign_key(&mut self, file: &str, record: Value) {
        let Some(key) = ForeignKeyKey::from_record(&record) else {
            warn!(file, %record, "discarding foreign-key record that is not an object");
            self.tally.discarded += 1;
            return;
        };
        if self.seen_foreign_keys.insert(key) {
            self.document.foreign_keys.push(record);
        } else {
            self.tally.duplicates += 1;
        }
    }

    pub(super) fn finish(self) -> (ConsolidatedDocument, ForeignKeyTally) {
        (self.document, self.tally)
    }
}
