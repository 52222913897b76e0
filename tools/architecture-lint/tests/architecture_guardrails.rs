//! Guardrail tests running the architecture lint over sources on disk.

use std::fs;

use architecture_lint::{ArchitectureLintError, Violation};
use camino::{Utf8Path, Utf8PathBuf};
use rstest::rstest;
use tempfile::TempDir;

const VALID_DOMAIN: (&str, &str) = (
    "domain/workflow.rs",
    "pub struct Workflow(String); impl Workflow { pub fn new(v: &str) -> Self { Self(v.to_owned()) } }",
);
const VALID_INBOUND: (&str, &str) = (
    "inbound/cli/mod.rs",
    "use crate::domain::workflow::Workflow; use clap::Parser; fn handler() { let _w = Workflow::new(\"ok\"); }",
);
const VALID_OUTBOUND: (&str, &str) = (
    "outbound/chat/runner.rs",
    "use crate::domain::workflow::Workflow; use reqwest::Client; pub struct Runner; impl Runner { pub fn run(&self, _w: Workflow) {} }",
);

fn lint_tree(sources: &[(&str, &str)]) -> Result<(), ArchitectureLintError> {
    let temp_dir = TempDir::new().expect("tempdir");
    let pipeline_dir = temp_dir.path().join("pipeline");
    let src_dir = pipeline_dir.join("src");
    for (file, contents) in sources {
        let path = src_dir.join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directories");
        }
        fs::write(&path, contents).expect("write source file");
    }
    let utf8_dir = Utf8Path::from_path(&pipeline_dir).expect("utf-8 temp path");
    architecture_lint::lint_pipeline_sources(utf8_dir)
}

fn violations(result: Result<(), ArchitectureLintError>) -> Vec<Violation> {
    match result {
        Err(ArchitectureLintError::Violations(violations)) => violations,
        other => panic!("expected violations error, got: {other:?}"),
    }
}

#[test]
fn valid_layers_pass() {
    let result = lint_tree(&[VALID_DOMAIN, VALID_INBOUND, VALID_OUTBOUND]);
    assert!(result.is_ok(), "expected success, got: {result:?}");
}

#[test]
fn files_outside_the_layers_are_ignored() {
    let result = lint_tree(&[
        VALID_DOMAIN,
        ("main.rs", "use schema_pipeline::outbound::chat; fn main() {}"),
        ("config/mod.rs", "use ortho_config::OrthoConfig;"),
    ]);
    assert!(result.is_ok(), "expected success, got: {result:?}");
}

#[rstest]
#[case::inbound_to_outbound(
    "inbound/cli/mod.rs",
    "use schema_pipeline::outbound::filesystem::FilesystemEntityStore; fn handler() {}",
    "crate::outbound"
)]
#[case::outbound_to_inbound(
    "outbound/filesystem/bad.rs",
    "use crate::inbound::cli; fn handler() { let _ = 1; }",
    "crate::inbound"
)]
#[case::domain_http(
    "domain/bad.rs",
    "use reqwest::Client; fn handler() { let _ = Client::new(); }",
    "external crate `reqwest`"
)]
#[case::domain_process(
    "domain/bad.rs",
    "fn spawn() { let _ = tokio::process::Command::new(\"sh\"); }",
    "must not use `tokio::process`"
)]
fn reports_each_violation(#[case] file: &str, #[case] contents: &str, #[case] expected: &str) {
    let violations = violations(lint_tree(&[VALID_DOMAIN, (file, contents)]));
    let expected_file = Utf8PathBuf::from(file);
    assert!(
        violations
            .iter()
            .any(|violation| violation.file == expected_file && violation.message.contains(expected)),
        "expected violation in '{file}' containing '{expected}', got: {violations:?}"
    );
}

#[test]
fn all_boundary_violations_are_reported() {
    let violations = violations(lint_tree(&[
        VALID_DOMAIN,
        VALID_INBOUND,
        VALID_OUTBOUND,
        (
            "inbound/cli/bad.rs",
            "use crate::outbound::agent_process::AgentProcessRunner; fn handler() {}",
        ),
        ("domain/bad.rs", "use cap_std::fs::Dir; fn open() {}"),
    ]));
    assert_eq!(violations.len(), 2, "got: {violations:?}");
}
