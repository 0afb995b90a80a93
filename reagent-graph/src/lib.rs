mod checkpoint;
mod config;
mod graph;
mod prompts;
mod reducer;
mod state;

pub use checkpoint::{CheckpointStore, FileCheckpointer, InMemoryCheckpointer};
pub use config::GraphConfig;
pub use graph::{AgentGraph, AgentGraphBuilder};
pub use prompts::{DEFAULT_OBSERVER_PROMPT, DEFAULT_PLANNER_PROMPT, DEFAULT_REACT_PROMPT};
pub use reducer::{BoundedAppend, ClearingAppend};
pub use state::{TurnState, TurnUpdate, MESSAGE_WINDOW};
