use super::*;
use rstest::{fixture, rstest};
use serde_json::json;

#[fixture]
fn template() -> WorkflowTemplate {
    WorkflowTemplate::new(
        "tables",
        StageSpec::producer("Expert Database Analyst", "List every table.", "JSON array"),
        StageSpec::validator("Database Validator", "Verify the list.", "JSON object"),
    )
}

#[rstest]
fn instantiate_without_feedback_keeps_base_instructions(template: WorkflowTemplate) {
    let workflow = template.instantiate(None);
    assert_eq!(workflow.producer().instructions, "List every table.");
    assert_eq!(workflow.validator().instructions, "Verify the list.");
    assert_eq!(workflow.entity(), "tables");
}

#[rstest]
fn instantiate_with_feedback_appends_report(template: WorkflowTemplate) {
    let report = ValidatorReport::parse(r#"{"validation_passed": false}"#);
    let workflow = template.instantiate(Some(&report));
    assert_eq!(
        workflow.producer().instructions,
        "List every table.\n\nPrevious validation results:\n\
         {\"validation_passed\":false}\n\
         Use this feedback to improve the next query."
    );
}

#[rstest]
fn feedback_never_accumulates(template: WorkflowTemplate) {
    let first = ValidatorReport::parse(r#"{"message": "first"}"#);
    let second = ValidatorReport::parse(r#"{"message": "second"}"#);
    let _ = template.instantiate(Some(&first));
    let workflow = template.instantiate(Some(&second));

    let instructions = &workflow.producer().instructions;
    assert!(instructions.contains("second"));
    assert!(!instructions.contains("first"));
    assert_eq!(template.producer().instructions, "List every table.");
}

#[rstest]
fn each_instantiation_gets_a_new_run_id(template: WorkflowTemplate) {
    assert_ne!(
        template.instantiate(None).run_id(),
        template.instantiate(None).run_id()
    );
}

#[rstest]
fn template_forces_stage_roles() {
    let template = WorkflowTemplate::new(
        "odd",
        StageSpec::validator("A", "p", "e"),
        StageSpec::producer("B", "v", "e"),
    );
    let workflow = template.instantiate(None);
    let roles: Vec<_> = workflow.stages().iter().map(|stage| stage.role).collect();
    assert_eq!(roles, vec![StageRole::Producer, StageRole::Validator]);
}

#[rstest]
#[case(RawStageOutput::Text("  [1, 2]\n".to_owned()), "[1, 2]")]
#[case(RawStageOutput::Structured(json!({"a": [1, 2]})), r#"{"a":[1,2]}"#)]
fn normalize_renders_strings(#[case] output: RawStageOutput, #[case] expected: &str) {
    assert_eq!(output.normalize(), expected);
}

#[rstest]
fn outputs_are_routed_by_role() {
    let outputs = WorkflowOutputs::new(vec![
        StageOutput {
            role: StageRole::Producer,
            output: RawStageOutput::Text("[]".to_owned()),
        },
        StageOutput {
            role: StageRole::Validator,
            output: RawStageOutput::Structured(json!({"validation_passed": true})),
        },
    ]);
    assert_eq!(
        outputs.normalized_for(StageRole::Validator).as_deref(),
        Some(r#"{"validation_passed":true}"#)
    );
    assert_eq!(
        outputs.normalized_for(StageRole::Producer).as_deref(),
        Some("[]")
    );
}

#[rstest]
fn empty_outputs_count_as_missing() {
    let outputs = WorkflowOutputs::from_text("   ", "");
    assert!(outputs.normalized_for(StageRole::Producer).is_none());
    assert!(outputs.normalized_for(StageRole::Validator).is_none());
}
