use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("completion provider failed: {0}")]
    LlmProvider(String),
    #[error("tool call failed for '{tool_name}': {reason}")]
    ToolCallFailed { tool_name: String, reason: String },
    #[error("duplicate tool name: {0}")]
    DuplicateToolName(String),
    #[error("checkpoint failed: {0}")]
    CheckpointFailed(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("serialization/deserialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("{0}")]
    Custom(String),
}
