use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::json;

use reagent_core::{
    AgentError, CompletionModel, CompletionRequest, Message, Role, Step,
};
use reagent_graph::{
    AgentGraph, CheckpointStore, FileCheckpointer, InMemoryCheckpointer, TurnState,
};

fn sample_state() -> TurnState {
    TurnState {
        input: "2+2".to_string(),
        output: "4".to_string(),
        messages: vec![
            Message::new(Role::User, "2+2"),
            Message::new(Role::Agent, "4"),
        ],
        steps: vec![
            Step::Action {
                thought: "add".to_string(),
                action: "calculator".to_string(),
                action_input: json!({"expression": "2+2"}),
                scratchpad: "Action: calculator".to_string(),
                log: Some("raw model text".to_string()),
            },
            Step::ToolOutput {
                tool_output: "4".to_string(),
                log: None,
            },
            Step::Observation {
                observation: "the result is 4".to_string(),
                log: None,
            },
            Step::Finish {
                output: "4".to_string(),
                log: Some("Agent: 4".to_string()),
            },
        ],
        plan: "1. add\n2. answer".to_string(),
        iterations: 0,
    }
}

#[tokio::test]
async fn in_memory_round_trip_preserves_value_equality() {
    let store = InMemoryCheckpointer::new();
    let state = sample_state();
    store.save("s1", &state).await.unwrap();
    let loaded = store.load("s1").await.unwrap().unwrap();
    assert_eq!(loaded, state);
}

#[tokio::test]
async fn in_memory_missing_session_is_absent_not_error() {
    let store = InMemoryCheckpointer::new();
    assert!(store.load("never-seen").await.unwrap().is_none());
}

#[tokio::test]
async fn file_round_trip_preserves_value_equality() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileCheckpointer::new(dir.path());
    let state = sample_state();
    store.save("user/42:main", &state).await.unwrap();
    let loaded = store.load("user/42:main").await.unwrap().unwrap();
    assert_eq!(loaded, state);
}

#[tokio::test]
async fn file_missing_session_is_absent_not_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileCheckpointer::new(dir.path());
    assert!(store.load("never-seen").await.unwrap().is_none());
}

struct ScriptedLlm {
    replies: std::sync::Mutex<std::collections::VecDeque<String>>,
}

impl ScriptedLlm {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: std::sync::Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
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

#[tokio::test]
async fn conversation_survives_graph_restarts_with_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn CheckpointStore> = Arc::new(FileCheckpointer::new(dir.path()));

    let first = AgentGraph::builder()
        .llm(Arc::new(ScriptedLlm::new(&["1. Answer", "Agent: noted."])))
        .checkpointer(store.clone())
        .build()
        .unwrap();
    first.invoke("s1", "remember me").await.unwrap();

    // A fresh graph over the same store picks the conversation back up.
    let second = AgentGraph::builder()
        .llm(Arc::new(ScriptedLlm::new(&["1. Answer", "Agent: I remember."])))
        .checkpointer(store)
        .build()
        .unwrap();
    let state = second.invoke("s1", "still there?").await.unwrap();

    assert_eq!(state.messages.len(), 4);
    assert_eq!(state.messages[0].content, "remember me");
    assert_eq!(state.output, "I remember.");
}
