//! Shared helpers for pipeline integration tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use camino::Utf8PathBuf;
use schema_pipeline::domain::ports::{WorkflowRunner, WorkflowRunnerError};
use schema_pipeline::domain::{Workflow, WorkflowOutputs};
use tempfile::TempDir;

/// Validator verdict that accepts the producer output.
pub const PASS: &str = r#"{"validation_passed": true, "issues": [], "message": "verified"}"#;
/// Validator verdict that rejects the producer output.
pub const FAIL: &str = r#"{"validation_passed": false, "issues": [{"type": "missing", "name": "Id"}], "message": "incomplete"}"#;

/// Runner answering each entity label with a fixed producer/validator pair.
///
/// Entities without a route fail validation with an empty producer output.
#[derive(Default)]
pub struct RoutedRunner {
    routes: HashMap<String, (String, String)>,
    calls: Mutex<Vec<String>>,
}

impl RoutedRunner {
    /// Answer `entity` with `producer` output and `validator` verdict.
    pub fn route(mut self, entity: &str, producer: String, validator: &str) -> Self {
        self.routes
            .insert(entity.to_owned(), (producer, validator.to_owned()));
        self
    }

    /// Entity labels in the order they were run.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl WorkflowRunner for RoutedRunner {
    async fn run(&self, workflow: &Workflow) -> Result<WorkflowOutputs, WorkflowRunnerError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(workflow.entity().to_owned());
        Ok(match self.routes.get(workflow.entity()) {
            Some((producer, validator)) => {
                WorkflowOutputs::from_text(producer.clone(), validator.clone())
            }
            None => WorkflowOutputs::from_text("", FAIL),
        })
    }
}

/// UTF-8 path of a temporary directory, joined with `relative`.
pub fn utf8_join(temp: &TempDir, relative: &str) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp.path().to_path_buf())
        .expect("temporary directory path is UTF-8")
        .join(relative)
}
