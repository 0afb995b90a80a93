use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::Value;

/// One unit of the streaming output protocol, serialized as a line-delimited
/// JSON object with a `type` discriminant.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    Planner {
        content: String,
        message_id: String,
    },
    Agent {
        content: String,
        message_id: String,
    },
    Observer {
        content: String,
        message_id: String,
    },
    ToolStart {
        tool_id: String,
        tool_name: String,
        input: Value,
    },
    ToolEnd {
        tool_id: String,
        tool_name: String,
        output: String,
    },
    ToolError {
        error: String,
    },
    Error {
        error: String,
    },
}

impl Frame {
    /// Renders the frame as one NDJSON line, trailing newline included.
    pub fn to_json_line(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"));
        line.push('\n');
        line
    }
}

/// Sink for node activity projected onto the streaming protocol. Emission
/// is fire-and-forget: a failing or absent consumer never affects control
/// flow.
pub trait EventSink: Send + Sync {
    fn emit(&self, frame: Frame);
}

/// Discards every frame; used by the synchronous invocation path.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _frame: Frame) {}
}

/// Forwards frames to an unbounded channel. A disconnected receiver turns
/// emission into a no-op, so a client hanging up mid-turn stops frame
/// production without disturbing the turn itself.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Frame>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<Frame>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, frame: Frame) {
        let _ = self.tx.send(frame);
    }
}
