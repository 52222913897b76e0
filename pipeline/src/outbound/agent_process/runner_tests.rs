//! Tests for the agent-process runner.
//!
//! Process-backed cases script the agent with `sh`, so they only run on Unix.

use std::time::Duration;

use rstest::{fixture, rstest};
use serde_json::json;

use super::*;
use crate::domain::{RawStageOutput, StageRole, StageSpec, WorkflowTemplate};

#[fixture]
fn workflow() -> Workflow {
    WorkflowTemplate::new(
        "tables",
        StageSpec::producer("Analyst", "List all tables.", "JSON array"),
        StageSpec::validator("Validator", "Check the list.", "JSON object"),
    )
    .instantiate(None)
}

#[fixture]
fn launch() -> ToolServerLaunch {
    ToolServerLaunch::dotnet_project(
        "dotnet",
        "/opt/tools/Schema Server",
        "SERVER=tcp:db,1433;DATABASE=sales;",
        Duration::from_secs(60),
    )
}

fn scripted(script: &str, launch: ToolServerLaunch) -> AgentProcessRunner {
    AgentProcessRunner::new("sh", ["-c", script], launch).with_timeout(Duration::from_secs(10))
}

#[rstest]
fn exports_tool_server_launch_environment(launch: ToolServerLaunch) {
    let environment = launch.environment();
    assert_eq!(
        environment,
        [
            (
                "CONNECTION_STRING",
                "SERVER=tcp:db,1433;DATABASE=sales;".to_owned()
            ),
            ("TOOL_SERVER_COMMAND", "dotnet".to_owned()),
            (
                "TOOL_SERVER_ARGS",
                r#"["run","--project","/opt/tools/Schema Server","--no-build"]"#.to_owned()
            ),
            ("TOOL_SERVER_CONNECT_TIMEOUT", "60".to_owned()),
        ]
    );
}

#[rstest]
fn serialises_workflow_request_with_roles(workflow: Workflow) {
    let request = serde_json::to_value(WorkflowRequestDto::from_workflow(&workflow))
        .expect("request should serialise");
    assert_eq!(request["entity"], json!("tables"));
    assert_eq!(request["run_id"], json!(workflow.run_id().to_string()));
    assert_eq!(request["stages"][0]["role"], json!("producer"));
    assert_eq!(request["stages"][0]["instructions"], json!("List all tables."));
    assert_eq!(request["stages"][1]["role"], json!("validator"));
    assert_eq!(request["stages"][1]["expected_output"], json!("JSON object"));
}

#[test]
fn decodes_text_structured_and_null_outputs() {
    let stdout = br#"{"stages":[
        {"role":"producer","output":"[\"dbo.Orders\"]"},
        {"role":"validator","output":{"validation_passed":true}},
        {"role":"validator","output":null}
    ]}"#;
    let outputs = parse_response(stdout).expect("response should decode");
    let stages = outputs.as_slice();

    assert_eq!(stages.len(), 3);
    assert_eq!(
        stages.first().map(|stage| &stage.output),
        Some(&RawStageOutput::Text("[\"dbo.Orders\"]".to_owned()))
    );
    assert_eq!(
        outputs.normalized_for(StageRole::Validator).as_deref(),
        Some("{\"validation_passed\":true}")
    );
}

#[rstest]
#[case::not_json(b"agent crashed".as_slice())]
#[case::unknown_role(br#"{"stages":[{"role":"critic","output":"x"}]}"#.as_slice())]
#[case::missing_stages(b"{}".as_slice())]
fn undecodable_stdout_maps_to_decode(#[case] stdout: &[u8]) {
    let error = parse_response(stdout).expect_err("decode should fail");
    assert!(matches!(error, WorkflowRunnerError::Decode { .. }));
}

#[rstest]
#[tokio::test]
async fn missing_program_maps_to_tool_server_unavailable(
    workflow: Workflow,
    launch: ToolServerLaunch,
) {
    let runner = AgentProcessRunner::new("schema-agent-does-not-exist", ["--serve"], launch);
    let error = runner.run(&workflow).await.expect_err("spawn should fail");
    assert!(matches!(error, WorkflowRunnerError::ToolServerUnavailable { .. }));
    assert!(error.to_string().contains("schema-agent-does-not-exist --serve"));
}

#[cfg(unix)]
#[rstest]
#[tokio::test]
async fn runs_scripted_agent_and_collects_outputs(workflow: Workflow, launch: ToolServerLaunch) {
    let runner = scripted(
        r#"cat >/dev/null; printf '{"stages":[{"role":"producer","output":"ok"},{"role":"validator","output":{"validation_passed":true}}]}'"#,
        launch,
    );
    let outputs = runner.run(&workflow).await.expect("run succeeds");
    assert_eq!(
        outputs.normalized_for(StageRole::Producer).as_deref(),
        Some("ok")
    );
}

#[cfg(unix)]
#[rstest]
#[tokio::test]
async fn agent_receives_workflow_on_stdin(workflow: Workflow, launch: ToolServerLaunch) {
    let runner = scripted(
        r#"input=$(cat); printf '{"stages":[{"role":"producer","output":%s}]}' "$input""#,
        launch,
    );
    let outputs = runner.run(&workflow).await.expect("run succeeds");
    let echoed = outputs
        .normalized_for(StageRole::Producer)
        .expect("producer output");
    let request: serde_json::Value = serde_json::from_str(&echoed).expect("echoed JSON");
    assert_eq!(request["entity"], json!("tables"));
}

#[cfg(unix)]
#[rstest]
#[tokio::test]
async fn agent_sees_connection_string(workflow: Workflow, launch: ToolServerLaunch) {
    let runner = scripted(
        r#"cat >/dev/null; printf '{"stages":[{"role":"producer","output":"%s"}]}' "$CONNECTION_STRING""#,
        launch,
    );
    let outputs = runner.run(&workflow).await.expect("run succeeds");
    assert_eq!(
        outputs.normalized_for(StageRole::Producer).as_deref(),
        Some("SERVER=tcp:db,1433;DATABASE=sales;")
    );
}

#[cfg(unix)]
#[rstest]
#[case::failure("cat >/dev/null; echo boom >&2; exit 2", "transport")]
#[case::tool_server_down("cat >/dev/null; exit 69", "tool_server_unavailable")]
#[case::garbage("cat >/dev/null; echo not-json", "decode")]
#[tokio::test]
async fn maps_agent_failures(
    workflow: Workflow,
    launch: ToolServerLaunch,
    #[case] script: &str,
    #[case] expected: &str,
) {
    let error = scripted(script, launch)
        .run(&workflow)
        .await
        .expect_err("run should fail");
    assert_eq!(error.label(), expected);
}

#[cfg(unix)]
#[rstest]
#[tokio::test]
async fn stderr_is_reported_on_failure(workflow: Workflow, launch: ToolServerLaunch) {
    let error = scripted("cat >/dev/null; echo boom >&2; exit 2", launch)
        .run(&workflow)
        .await
        .expect_err("run should fail");
    assert!(error.to_string().contains("boom"));
}

#[cfg(unix)]
#[rstest]
#[tokio::test]
async fn slow_agents_time_out(workflow: Workflow, launch: ToolServerLaunch) {
    let runner = AgentProcessRunner::new("sh", ["-c", "sleep 5"], launch)
        .with_timeout(Duration::from_millis(100));
    let error = runner.run(&workflow).await.expect_err("run should time out");
    assert!(matches!(error, WorkflowRunnerError::Timeout { .. }));
}
