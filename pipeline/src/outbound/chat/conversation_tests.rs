//! Tool-calling loop behaviour against scripted completions and tools.

use std::collections::VecDeque;
use std::sync::Mutex;

use rstest::{fixture, rstest};
use serde_json::json;

use super::*;
use crate::outbound::chat::dto::ToolCallDto;

/// Replays canned assistant turns and records every request body.
struct ScriptedCompletions {
    replies: Mutex<VecDeque<AssistantMessageDto>>,
    requests: Mutex<Vec<Value>>,
}

impl ScriptedCompletions {
    fn new(replies: impl IntoIterator<Item = AssistantMessageDto>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<Value> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl Completions for ScriptedCompletions {
    async fn complete(
        &self,
        request: &ChatRequestDto<'_>,
    ) -> Result<AssistantMessageDto, WorkflowRunnerError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(serde_json::to_value(request).expect("request should serialise"));
        let reply = self.replies.lock().expect("replies lock").pop_front();
        Ok(reply.unwrap_or_else(|| calls(&[("call_again", "list_tables", "{}")])))
    }
}

struct FakeTools {
    definitions: Vec<ToolDefinition>,
    invoked: Vec<(String, Value)>,
    reply: Result<ToolReply, WorkflowRunnerError>,
}

#[async_trait]
impl ToolInvoker for FakeTools {
    fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    async fn invoke(
        &mut self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolReply, WorkflowRunnerError> {
        self.invoked.push((name.to_owned(), arguments));
        self.reply.clone()
    }
}

#[fixture]
fn tools() -> FakeTools {
    FakeTools {
        definitions: vec![
            ToolDefinition {
                name: "list_tables".to_owned(),
                description: "Lists tables".to_owned(),
                input_schema: json!({"type": "object", "properties": {}}),
            },
            ToolDefinition {
                name: "describe_table".to_owned(),
                description: String::new(),
                input_schema: Value::Null,
            },
        ],
        invoked: Vec::new(),
        reply: Ok(ToolReply {
            text: "dbo.Orders".to_owned(),
            is_error: false,
        }),
    }
}

fn prompt() -> Vec<ChatMessageDto> {
    vec![
        ChatMessageDto::system("You are Analyst."),
        ChatMessageDto::user("List all tables."),
    ]
}

fn answer(content: &str) -> AssistantMessageDto {
    AssistantMessageDto {
        content: Some(content.to_owned()),
        tool_calls: Vec::new(),
    }
}

fn calls(requested: &[(&str, &str, &str)]) -> AssistantMessageDto {
    AssistantMessageDto {
        content: None,
        tool_calls: requested
            .iter()
            .map(|(id, name, arguments)| ToolCallDto {
                id: (*id).to_owned(),
                kind: "function".to_owned(),
                function: FunctionCallDto {
                    name: (*name).to_owned(),
                    arguments: (*arguments).to_owned(),
                },
            })
            .collect(),
    }
}

#[rstest]
#[tokio::test]
async fn direct_answers_end_the_stage_and_offer_every_tool(mut tools: FakeTools) {
    let completions = ScriptedCompletions::new([answer("[\"dbo.Orders\"]")]);

    let text = converse(&completions, &mut tools, prompt(), false)
        .await
        .expect("stage should answer");

    assert_eq!(text, "[\"dbo.Orders\"]");
    let requests = completions.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0]["tools"],
        json!([
            {
                "type": "function",
                "function": {
                    "name": "list_tables",
                    "description": "Lists tables",
                    "parameters": {"type": "object", "properties": {}}
                }
            },
            {
                "type": "function",
                "function": {
                    "name": "describe_table",
                    "parameters": {"type": "object", "properties": {}}
                }
            }
        ])
    );
    assert!(tools.invoked.is_empty());
}

#[rstest]
#[tokio::test]
async fn tool_answers_are_fed_back_before_the_next_round(mut tools: FakeTools) {
    let completions = ScriptedCompletions::new([
        calls(&[("call_1", "describe_table", r#"{"table":"Orders"}"#)]),
        answer("done"),
    ]);

    let text = converse(&completions, &mut tools, prompt(), true)
        .await
        .expect("stage should answer");

    assert_eq!(text, "done");
    assert_eq!(
        tools.invoked,
        [("describe_table".to_owned(), json!({"table": "Orders"}))]
    );
    let requests = completions.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[1]["messages"][2],
        json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": {"name": "describe_table", "arguments": "{\"table\":\"Orders\"}"}
            }]
        })
    );
    assert_eq!(
        requests[1]["messages"][3],
        json!({"role": "tool", "content": "dbo.Orders", "tool_call_id": "call_1"})
    );
    assert!(
        requests
            .iter()
            .all(|request| request["response_format"] == json!({"type": "json_object"}))
    );
}

#[rstest]
#[tokio::test]
async fn every_call_in_a_turn_gets_an_answer(mut tools: FakeTools) {
    let completions = ScriptedCompletions::new([
        calls(&[
            ("call_1", "list_tables", ""),
            ("call_2", "drop_table", "{}"),
            ("call_3", "describe_table", "[\"Orders\"]"),
        ]),
        answer("done"),
    ]);

    converse(&completions, &mut tools, prompt(), false)
        .await
        .expect("stage should answer");

    assert_eq!(tools.invoked, [("list_tables".to_owned(), json!({}))]);
    let messages = &completions.requests()[1]["messages"];
    assert_eq!(messages[3]["content"], json!("dbo.Orders"));
    assert_eq!(messages[4]["content"], json!("error: unknown tool `drop_table`"));
    assert!(
        messages[5]["content"]
            .as_str()
            .is_some_and(|text| text.starts_with("error: arguments for `describe_table`"))
    );
    assert_eq!(messages[5]["tool_call_id"], json!("call_3"));
}

#[rstest]
#[tokio::test]
async fn tool_failures_are_relayed_to_the_model(mut tools: FakeTools) {
    tools.reply = Ok(ToolReply {
        text: "login failed".to_owned(),
        is_error: true,
    });
    let completions =
        ScriptedCompletions::new([calls(&[("call_1", "list_tables", "{}")]), answer("gave up")]);

    let text = converse(&completions, &mut tools, prompt(), false)
        .await
        .expect("stage should answer");

    assert_eq!(text, "gave up");
    assert_eq!(
        completions.requests()[1]["messages"][3]["content"],
        json!("error: login failed")
    );
}

#[rstest]
#[tokio::test]
async fn lost_tool_servers_fail_the_stage(mut tools: FakeTools) {
    tools.reply = Err(WorkflowRunnerError::tool_server_unavailable("server closed its output"));
    let completions = ScriptedCompletions::new([calls(&[("call_1", "list_tables", "{}")])]);

    let error = converse(&completions, &mut tools, prompt(), false)
        .await
        .expect_err("stage should fail");

    assert_eq!(error.label(), "tool_server_unavailable");
    assert_eq!(completions.requests().len(), 1);
}

#[rstest]
#[tokio::test]
async fn endless_tool_requests_stop_at_the_round_limit(mut tools: FakeTools) {
    let completions = ScriptedCompletions::new([]);

    let error = converse(&completions, &mut tools, prompt(), false)
        .await
        .expect_err("stage should give up");

    assert!(matches!(error, WorkflowRunnerError::Decode { .. }));
    assert_eq!(completions.requests().len(), MAX_TOOL_ROUNDS);
    assert_eq!(tools.invoked.len(), MAX_TOOL_ROUNDS);
}

#[rstest]
#[tokio::test]
async fn stages_without_tools_omit_the_tools_field() {
    let mut tools = FakeTools {
        definitions: Vec::new(),
        invoked: Vec::new(),
        reply: Ok(ToolReply {
            text: String::new(),
            is_error: false,
        }),
    };
    let completions = ScriptedCompletions::new([AssistantMessageDto::default()]);

    let text = converse(&completions, &mut tools, prompt(), false)
        .await
        .expect("stage should answer");

    assert_eq!(text, "");
    assert!(completions.requests()[0].get("tools").is_none());
}

#[rstest]
#[case::empty("", true)]
#[case::object(r#"{"table":"Orders"}"#, true)]
#[case::array("[1]", false)]
#[case::truncated(r#"{"table":"#, false)]
fn only_object_arguments_are_dispatched(#[case] raw: &str, #[case] accepted: bool) {
    assert_eq!(parse_arguments(raw).is_ok(), accepted);
}
