//! Printable results of a command.

use std::fmt;

use crate::domain::{ConsolidationReport, EntityStatus, StageReport};

/// Result of one command, rendered for the terminal through `Display`.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// One extraction stage ran.
    Stage(StageReport),
    /// The consolidated document was written.
    Consolidated(ConsolidationReport),
    /// The full extraction chain ran.
    RunAll {
        /// Table inventory stage.
        tables: StageReport,
        /// Column extraction stage.
        columns: StageReport,
        /// Relationship extraction stage.
        relationships: StageReport,
        /// Final consolidation.
        consolidation: ConsolidationReport,
    },
}

impl CommandOutcome {
    /// Whether every entity of every stage was persisted.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        match self {
            Self::Stage(report) => report.skipped_count() == 0,
            Self::Consolidated(_) => true,
            Self::RunAll {
                tables,
                columns,
                relationships,
                ..
            } => [tables, columns, relationships]
                .iter()
                .all(|report| report.skipped_count() == 0),
        }
    }
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stage(report) => write_stage(f, report),
            Self::Consolidated(report) => write_consolidation(f, report),
            Self::RunAll {
                tables,
                columns,
                relationships,
                consolidation,
            } => {
                for (title, report) in [
                    ("tables", tables),
                    ("columns", columns),
                    ("relationships", relationships),
                ] {
                    writeln!(f, "== {title} ==")?;
                    write_stage(f, report)?;
                }
                writeln!(f, "== consolidate ==")?;
                write_consolidation(f, consolidation)
            }
        }
    }
}

fn write_stage(f: &mut fmt::Formatter<'_>, report: &StageReport) -> fmt::Result {
    for outcome in report.outcomes() {
        match &outcome.status {
            EntityStatus::Persisted => writeln!(
                f,
                "saved   {} ({} attempts)",
                outcome.file_name,
                outcome.summary.attempts()
            )?,
            EntityStatus::Skipped(reason) => writeln!(
                f,
                "skipped {} ({} attempts, {})",
                outcome.file_name,
                outcome.summary.attempts(),
                reason.label()
            )?,
        }
    }
    writeln!(
        f,
        "{} saved, {} skipped",
        report.persisted_count(),
        report.skipped_count()
    )
}

fn write_consolidation(f: &mut fmt::Formatter<'_>, report: &ConsolidationReport) -> fmt::Result {
    for skipped in &report.skipped {
        writeln!(f, "ignored {} ({})", skipped.file, skipped.reason.label())?;
    }
    writeln!(
        f,
        "merged {} files: {} foreign keys, {} columns, {} tables ({} duplicate foreign keys dropped)",
        report.merged.len(),
        report.document.foreign_keys.len(),
        report.document.columns.len(),
        report.document.tables.len(),
        report.duplicate_foreign_keys
    )?;
    if report.discarded_foreign_keys > 0 {
        writeln!(
            f,
            "discarded {} foreign-key records that were not objects",
            report.discarded_foreign_keys
        )?;
    }
    Ok(())
}
