//! Runs one streamed turn against a canned model and prints the NDJSON
//! frames a live client would receive.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::json;

use reagent_core::{
    AgentError, CompletionModel, CompletionRequest, Tool, ToolError, Value,
};
use reagent_graph::AgentGraph;

struct CannedLlm {
    replies: Mutex<VecDeque<String>>,
}

impl CompletionModel for CannedLlm {
    fn stream(&self, _request: CompletionRequest) -> BoxStream<'_, Result<String, AgentError>> {
        let reply = self.replies.lock().unwrap().pop_front().unwrap_or_default();
        futures::stream::once(async move { Ok(reply) }).boxed()
    }
}

struct Calculator;

#[async_trait::async_trait]
impl Tool for Calculator {
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

#[tokio::main]
async fn main() -> Result<(), AgentError> {
    let llm = CannedLlm {
        replies: Mutex::new(
            [
                "1. Use the calculator\n2. Answer the user",
                "Thought: add the numbers\nAction: calculator\nAction Input: {\"expression\": \"2+2\"}\nSTOP",
                "Observation: the calculator returned 4",
                "Agent: The answer is 4.\nSTOP",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        ),
    };

    let graph = AgentGraph::builder()
        .llm(Arc::new(llm))
        .tool(Arc::new(Calculator))
        .build()?;

    let mut frames = graph.stream("demo", "2+2");
    while let Some(frame) = frames.next().await {
        print!("{}", frame.to_json_line());
    }
    Ok(())
}
