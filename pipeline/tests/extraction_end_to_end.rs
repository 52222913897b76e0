//! End-to-end extraction and consolidation over the filesystem adapters.
//!
//! A routed in-process runner stands in for the agent runtime so the tests
//! exercise the validation loop, the entity store, and the document writer
//! together without a database or language model.
#![expect(
    clippy::expect_used,
    reason = "integration tests fail fast on broken fixtures"
)]

use std::sync::Arc;

use rstest::{fixture, rstest};
use schema_pipeline::domain::ports::EntityOutputRepository;
use schema_pipeline::domain::{
    ConsolidatedDocument, ExtractionPipeline, PipelineStores, SchemaConsolidator, SkipReason,
    StageCatalogue, TASKS_FILE, ValidationLoop,
};
use schema_pipeline::inbound::cli::{
    Command, CommandOutcome, CommandServices, TaskListSource, execute,
};
use schema_pipeline::outbound::filesystem::{FilesystemDocumentWriter, FilesystemEntityStore};
use serde_json::{Value, json};
use tempfile::TempDir;

mod support;

use support::{FAIL, PASS, RoutedRunner, utf8_join};

#[fixture]
fn temp() -> TempDir {
    TempDir::new().expect("temp dir")
}

fn routed_runner() -> RoutedRunner {
    let relationship = json!([{
        "name": "FK_Orders_Customers",
        "table": "Orders",
        "column": "CustomerId",
        "ref_table": "Customers",
        "ref_column": "Id"
    }]);
    RoutedRunner::default()
        .route(
            "tables",
            json!([
                {"schema": "dbo", "table": "Orders"},
                {"schema": "dbo", "table": "Customers"}
            ])
            .to_string(),
            PASS,
        )
        .route(
            "dbo.Orders columns",
            format!(
                "```json\n{}\n```",
                json!([
                    {"table_name": "Orders", "column_name": "Id", "data_type": "int",
                     "length": null, "is_primary_key": true, "is_nullable": false},
                    {"table_name": "Orders", "column_name": "CustomerId", "data_type": "int",
                     "length": null, "is_primary_key": false, "is_nullable": false}
                ])
            ),
            PASS,
        )
        .route(
            "dbo.Customers columns",
            json!([{"table_name": "Customers", "column_name": "Id", "data_type": "int"}])
                .to_string(),
            FAIL,
        )
        .route("dbo.Orders relationships", relationship.to_string(), PASS)
        .route("dbo.Customers relationships", relationship.to_string(), PASS)
}

fn services(temp: &TempDir, runner: Arc<RoutedRunner>) -> CommandServices {
    let raw_dir = utf8_join(temp, "output");
    let raw: Arc<dyn EntityOutputRepository> = Arc::new(FilesystemEntityStore::new(raw_dir.clone()));
    let pipeline = ExtractionPipeline::new(
        ValidationLoop::new(runner, 2),
        StageCatalogue::new("sales", vec!["list_tables".to_owned()]),
        PipelineStores {
            raw: Arc::clone(&raw),
            tasks: Arc::new(FilesystemEntityStore::new(utf8_join(temp, "output/tasks"))),
        },
    );
    let consolidator = SchemaConsolidator::new(
        Arc::clone(&raw),
        Arc::new(FilesystemDocumentWriter::new(raw_dir.join("consolidated.json"))),
    )
    .excluding("consolidated.json");

    CommandServices {
        pipeline: Some(pipeline),
        consolidator,
        task_list: TaskListSource {
            store: raw,
            file: TASKS_FILE.to_owned(),
        },
    }
}

fn read_json(temp: &TempDir, relative: &str) -> Value {
    let contents = std::fs::read_to_string(temp.path().join(relative)).expect("file exists");
    serde_json::from_str(&contents).expect("file holds JSON")
}

#[rstest]
#[tokio::test]
async fn run_all_extracts_validates_and_consolidates(temp: TempDir) {
    let runner = Arc::new(routed_runner());
    let services = services(&temp, Arc::clone(&runner));

    let outcome = execute(&Command::RunAll, &services)
        .await
        .expect("run-all succeeds");

    let CommandOutcome::RunAll {
        tables,
        columns,
        relationships,
        consolidation,
    } = &outcome
    else {
        panic!("expected a run-all outcome, got {outcome:?}");
    };
    assert_eq!(tables.persisted_count(), 1);
    assert_eq!((columns.persisted_count(), columns.skipped_count()), (1, 1));
    assert_eq!(relationships.persisted_count(), 2);
    assert_eq!(consolidation.duplicate_foreign_keys, 1);
    assert!(!outcome.is_complete());

    assert_eq!(
        runner.calls(),
        [
            "tables",
            "dbo.Orders columns",
            "dbo.Customers columns",
            "dbo.Customers columns",
            "dbo.Orders relationships",
            "dbo.Customers relationships",
        ]
    );

    assert!(
        !temp.path().join("output/Customers_schema.json").exists(),
        "rejected entities are never written"
    );
    let fenced = read_json(&temp, "output/Orders_schema.json");
    assert_eq!(fenced.as_array().map(Vec::len), Some(2));

    let document: ConsolidatedDocument =
        serde_json::from_value(read_json(&temp, "output/consolidated.json"))
            .expect("document deserialises");
    assert_eq!(document.foreign_keys.len(), 1);
    assert_eq!(document.columns.len(), 2);
    assert_eq!(document.tables.len(), 2);
}

#[rstest]
#[tokio::test]
async fn rerunning_consolidation_ignores_its_own_output(temp: TempDir) {
    let services = services(&temp, Arc::new(routed_runner()));
    execute(&Command::RunAll, &services)
        .await
        .expect("run-all succeeds");

    let outcome = execute(
        &Command::Consolidate {
            input_dir: None,
            output_file: None,
        },
        &services,
    )
    .await
    .expect("consolidate succeeds");

    let CommandOutcome::Consolidated(report) = outcome else {
        panic!("expected a consolidation outcome");
    };
    assert!(report.skipped.is_empty());
    assert_eq!(
        report.merged,
        [
            "Customers_relationships.json",
            "Orders_relationships.json",
            "Orders_schema.json",
            "tables.json",
        ]
    );
}

#[rstest]
#[tokio::test]
async fn consolidation_skips_broken_files_and_keeps_going(temp: TempDir) {
    let output = temp.path().join("output");
    std::fs::create_dir_all(&output).expect("output dir");
    std::fs::write(output.join("tables.json"), r#"[{"schema":"dbo","table":"Orders"}]"#)
        .expect("tables");
    std::fs::write(output.join("Broken_schema.json"), "{not json").expect("broken");
    std::fs::write(output.join("notes_relationships.json"), "42").expect("scalar");
    std::fs::write(output.join("readme.txt"), "ignored").expect("readme");
    std::fs::write(output.join("summary.json"), "[]").expect("summary");

    let services = services(&temp, Arc::new(RoutedRunner::default()));
    let outcome = execute(
        &Command::Consolidate {
            input_dir: None,
            output_file: None,
        },
        &services,
    )
    .await
    .expect("consolidate succeeds");

    let CommandOutcome::Consolidated(report) = outcome else {
        panic!("expected a consolidation outcome");
    };
    assert_eq!(report.merged, ["tables.json"]);
    let reasons: Vec<(&str, &str)> = report
        .skipped
        .iter()
        .map(|skipped| (skipped.file.as_str(), skipped.reason.label()))
        .collect();
    assert_eq!(
        reasons,
        [
            ("Broken_schema.json", "invalid_json"),
            ("notes_relationships.json", "unsupported_payload"),
            ("summary.json", "unclassified"),
        ]
    );
    assert!(matches!(
        report.skipped.first().map(|skipped| &skipped.reason),
        Some(SkipReason::InvalidJson { .. })
    ));
    assert_eq!(
        read_json(&temp, "output/consolidated.json"),
        json!({
            "foreign_keys": [],
            "columns": [],
            "tables": [{"schema": "dbo", "table": "Orders"}]
        })
    );
}

#[rstest]
#[tokio::test]
async fn columns_without_an_inventory_abort(temp: TempDir) {
    let services = services(&temp, Arc::new(routed_runner()));
    let error = execute(&Command::Columns, &services)
        .await
        .expect_err("no tables.json yet");
    assert!(error.to_string().contains("tables.json"));
}
