use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::json;

use reagent_core::{
    AgentError, CompletionModel, CompletionRequest, Step, Tool, ToolError, Value,
};
use reagent_graph::{AgentGraph, TurnState};

struct ScriptedLlm {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedLlm {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
        }
    }
}

impl CompletionModel for ScriptedLlm {
    fn stream(&self, _request: CompletionRequest) -> BoxStream<'_, Result<String, AgentError>> {
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("scripted reply available");
        futures::stream::once(async move { Ok(reply) }).boxed()
    }
}

struct LoopingLlm {
    reply: String,
}

impl CompletionModel for LoopingLlm {
    fn stream(&self, _request: CompletionRequest) -> BoxStream<'_, Result<String, AgentError>> {
        let reply = self.reply.clone();
        futures::stream::once(async move { Ok(reply) }).boxed()
    }
}

struct CalculatorTool;

#[async_trait::async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "evaluates arithmetic expressions"
    }

    fn schema(&self) -> Value {
        json!({"type": "object", "properties": {"expression": {"type": "string"}}})
    }

    async fn invoke(&self, _args: Value) -> Result<Value, ToolError> {
        Ok(json!(4))
    }
}

struct FailingTool;

#[async_trait::async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "flaky"
    }

    fn description(&self) -> &str {
        "always fails"
    }

    fn schema(&self) -> Value {
        json!({"type": "object"})
    }

    async fn invoke(&self, _args: Value) -> Result<Value, ToolError> {
        Err(ToolError::ExecutionFailed("backend unreachable".to_string()))
    }
}

const ACTION_REPLY: &str =
    "Thought: add the numbers\nAction: calculator\nAction Input: {\"expression\": \"2+2\"}\nSTOP";

fn calculator_graph(replies: &[&str]) -> AgentGraph {
    AgentGraph::builder()
        .llm(Arc::new(ScriptedLlm::new(replies)))
        .tool(Arc::new(CalculatorTool))
        .build()
        .unwrap()
}

fn step_kinds(state: &TurnState) -> Vec<&'static str> {
    state
        .steps
        .iter()
        .map(|step| match step {
            Step::Action { .. } => "action",
            Step::ToolOutput { .. } => "tool_output",
            Step::Observation { .. } => "observation",
            Step::Finish { .. } => "finish",
            Step::Error { .. } => "error",
        })
        .collect()
}

#[tokio::test]
async fn calculator_turn_runs_full_cycle() {
    let graph = calculator_graph(&[
        "1. Use calculator for 2+2\n2. Answer the user",
        ACTION_REPLY,
        "Observation: the calculator returned 4",
        "Agent: The answer is 4.\nSTOP",
    ]);

    let state = graph.invoke("s1", "2+2").await.unwrap();

    assert_eq!(
        step_kinds(&state),
        vec!["action", "tool_output", "observation", "finish"]
    );
    assert_eq!(state.output, "The answer is 4.");
    assert!(state.plan.starts_with("1. Use calculator"));
    assert_eq!(state.iterations, 0);

    match &state.steps[1] {
        Step::ToolOutput { tool_output, .. } => assert_eq!(tool_output, "4"),
        other => panic!("expected ToolOutput, got {other:?}"),
    }
    match &state.steps[2] {
        Step::Observation { observation, .. } => {
            assert_eq!(observation, "the calculator returned 4")
        }
        other => panic!("expected Observation, got {other:?}"),
    }

    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.messages[0].content, "2+2");
    assert_eq!(state.messages[1].content, "The answer is 4.");
}

#[tokio::test]
async fn unknown_tool_name_loops_back_to_agent() {
    let graph = calculator_graph(&[
        "1. Answer",
        "Action: teleport\nAction Input: {}",
        "Agent: I cannot do that.",
    ]);

    let state = graph.invoke("s1", "go north").await.unwrap();

    assert_eq!(step_kinds(&state), vec!["error", "finish"]);
    match &state.steps[0] {
        Step::Error { error, .. } => assert!(error.contains("Invalid Action `teleport`")),
        other => panic!("expected Error, got {other:?}"),
    }
    assert_eq!(state.output, "I cannot do that.");
}

#[tokio::test]
async fn malformed_action_input_loops_back_to_agent() {
    let graph = calculator_graph(&[
        "1. Answer",
        "Action: calculator\nAction Input: {expression: 2+2}",
        "Agent: 4",
    ]);

    let state = graph.invoke("s1", "2+2").await.unwrap();

    assert_eq!(step_kinds(&state), vec!["error", "finish"]);
}

#[tokio::test]
async fn failing_tool_is_observed_and_recovered() {
    let graph = AgentGraph::builder()
        .llm(Arc::new(ScriptedLlm::new(&[
            "1. Try the flaky tool",
            "Action: flaky\nAction Input: {}",
            "Observation: the tool backend was unreachable",
            "Agent: The backend is down.",
        ])))
        .tool(Arc::new(FailingTool))
        .build()
        .unwrap();

    let state = graph.invoke("s1", "ping").await.unwrap();

    assert_eq!(
        step_kinds(&state),
        vec!["action", "error", "observation", "finish"]
    );
    match &state.steps[1] {
        Step::Error { error, .. } => {
            assert!(error.starts_with("Action `flaky` failed: <"));
        }
        other => panic!("expected Error, got {other:?}"),
    }
    assert_eq!(state.output, "The backend is down.");
}

#[tokio::test]
async fn budget_exhaustion_ends_turn_without_output() {
    let graph = AgentGraph::builder()
        .llm(Arc::new(LoopingLlm {
            reply: ACTION_REPLY.to_string(),
        }))
        .tool(Arc::new(CalculatorTool))
        .max_iterations(3)
        .build()
        .unwrap();

    let state = graph.invoke("s1", "2+2").await.unwrap();

    assert_eq!(state.output, "");
    assert_eq!(state.iterations, 0);
    assert!(state.messages.is_empty());
    // 4 agent invocations, the first 3 each followed by a tool result and
    // an observation.
    let kinds = step_kinds(&state);
    assert_eq!(kinds.iter().filter(|k| **k == "action").count(), 4);
    assert_eq!(kinds.iter().filter(|k| **k == "tool_output").count(), 3);
    assert_eq!(kinds.iter().filter(|k| **k == "observation").count(), 3);
}

#[tokio::test]
async fn steps_reset_between_turns_but_messages_persist() {
    let graph = calculator_graph(&[
        // turn one
        "1. Answer",
        "Agent: hello there.",
        // turn two
        "1. Answer again",
        "Agent: still here.",
    ]);

    let first = graph.invoke("s1", "hi").await.unwrap();
    assert_eq!(first.messages.len(), 2);
    assert_eq!(step_kinds(&first), vec!["finish"]);

    let second = graph.invoke("s1", "you there?").await.unwrap();
    assert_eq!(second.messages.len(), 4);
    // Only the second turn's trace survives the planner reset.
    assert_eq!(step_kinds(&second), vec!["finish"]);
    assert_eq!(second.output, "still here.");
}

#[tokio::test]
async fn message_window_drops_oldest_turns() {
    let mut replies = Vec::new();
    for i in 0..8 {
        replies.push("1. Answer".to_string());
        replies.push(format!("Agent: reply {i}."));
    }
    let reply_refs: Vec<&str> = replies.iter().map(|s| s.as_str()).collect();
    let graph = calculator_graph(&reply_refs);

    let mut last = None;
    for i in 0..8 {
        last = Some(graph.invoke("s1", &format!("question {i}")).await.unwrap());
    }
    let state = last.unwrap();

    assert_eq!(state.messages.len(), 10);
    assert_eq!(state.messages[0].content, "question 3");
    assert_eq!(state.messages[9].content, "reply 7.");
}

#[tokio::test]
async fn tool_catalog_lists_registered_tools() {
    let graph = calculator_graph(&[]);
    let catalog = graph.tool_catalog();
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog[0].name, "calculator");
    assert_eq!(catalog[0].description, "evaluates arithmetic expressions");
}

#[tokio::test]
async fn sessions_do_not_share_state() {
    let graph = calculator_graph(&[
        "1. Answer",
        "Agent: for session one.",
        "1. Answer",
        "Agent: for session two.",
    ]);

    let first = graph.invoke("alpha", "hi").await.unwrap();
    let second = graph.invoke("beta", "hi").await.unwrap();

    assert_eq!(first.messages.len(), 2);
    assert_eq!(second.messages.len(), 2);
    assert_eq!(second.messages[1].content, "for session two.");
}
