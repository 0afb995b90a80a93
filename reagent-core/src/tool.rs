use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::event::{EventSink, Frame};
use crate::step::Step;
use crate::{AgentError, Value};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn schema(&self) -> Value;
    async fn invoke(&self, args: Value) -> Result<Value, ToolError>;
}

/// Catalog record for one registered tool, as returned to clients asking
/// what the agent can do.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Name → tool mapping assembled once at startup.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    specs: Vec<ToolSpec>,
    names: Vec<String>,
}

pub struct ToolRegistryBuilder {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder { tools: Vec::new() }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Pretty-printed catalog, the form the prompts embed.
    pub fn catalog_json(&self) -> String {
        serde_json::to_string_pretty(&self.specs).unwrap_or_else(|_| String::from("[]"))
    }

    /// Resolves `action` and runs it with error capture. Failures never
    /// escape: an unknown name or a failing tool becomes an `Error` step
    /// that re-enters the loop, with a matching out-of-band frame on the
    /// sink.
    pub async fn dispatch(&self, action: &str, input: &Value, sink: &dyn EventSink) -> Step {
        let Some(tool) = self.tools.get(action) else {
            // The parser already rejects unregistered names; this guards
            // direct callers.
            let error = format!("Invalid tool name `{action}`");
            tracing::warn!(action, "dispatch of unregistered tool");
            sink.emit(Frame::Error {
                error: error.clone(),
            });
            return Step::Error { error, log: None };
        };

        let tool_id = Uuid::new_v4().to_string();
        sink.emit(Frame::ToolStart {
            tool_id: tool_id.clone(),
            tool_name: action.to_string(),
            input: input.clone(),
        });

        match tool.invoke(input.clone()).await {
            Ok(output) => {
                let tool_output = render_tool_output(&output);
                sink.emit(Frame::ToolEnd {
                    tool_id,
                    tool_name: action.to_string(),
                    output: tool_output.clone(),
                });
                Step::ToolOutput {
                    tool_output,
                    log: None,
                }
            }
            Err(err) => {
                let error = format!("Action `{action}` failed: < {err} >");
                tracing::warn!(action, error = %err, "tool invocation failed");
                sink.emit(Frame::ToolError {
                    error: error.clone(),
                });
                Step::Error { error, log: None }
            }
        }
    }
}

fn render_tool_output(output: &Value) -> String {
    match output {
        Value::String(text) => text.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

impl ToolRegistryBuilder {
    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Registers a tool only when `enabled` is true, e.g. a retrieval tool
    /// whose backing store was confirmed reachable at startup.
    pub fn tool_if(self, enabled: bool, tool: Arc<dyn Tool>) -> Self {
        if enabled {
            self.tool(tool)
        } else {
            self
        }
    }

    pub fn build(self) -> Result<ToolRegistry, AgentError> {
        let mut tools = HashMap::new();
        let mut specs = Vec::new();
        let mut names = Vec::new();
        for tool in self.tools {
            let name = tool.name().to_string();
            if tools.contains_key(&name) {
                return Err(AgentError::DuplicateToolName(name));
            }
            specs.push(ToolSpec {
                name: name.clone(),
                description: tool.description().to_string(),
                parameters: tool.schema(),
            });
            names.push(name.clone());
            tools.insert(name, tool);
        }
        Ok(ToolRegistry {
            tools,
            specs,
            names,
        })
    }
}
