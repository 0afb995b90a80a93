mod error;
mod event;
mod llm;
mod parser;
mod prompt;
mod step;
mod stop;
mod tool;

pub use error::AgentError;
pub use event::{ChannelSink, EventSink, Frame, NullSink};
pub use llm::{CompletionModel, CompletionRequest};
pub use parser::{parse_observation, parse_plan, parse_reaction};
pub use prompt::PromptTemplate;
pub use step::{Message, Role, Step};
pub use stop::{default_stop_markers, strip_stop_markers, FINAL_ANSWER_MARKER, STOP_MARKERS};
pub use tool::{Tool, ToolError, ToolRegistry, ToolRegistryBuilder, ToolSpec};

pub type Value = serde_json::Value;
