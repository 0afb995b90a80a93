use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Value;

/// One typed record in a turn's reasoning trace.
///
/// A well-formed trace starts empty, pairs every `Action` with exactly one
/// `ToolOutput` or `Error`, follows each tool result with an `Observation`
/// (unless the turn retries through an `Error`), and ends with a single
/// `Finish` or is abandoned on budget exhaustion.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    Action {
        thought: String,
        action: String,
        action_input: Value,
        scratchpad: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        log: Option<String>,
    },
    ToolOutput {
        tool_output: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        log: Option<String>,
    },
    Observation {
        observation: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        log: Option<String>,
    },
    Finish {
        output: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        log: Option<String>,
    },
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        log: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum Role {
    User,
    Agent,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "User"),
            Role::Agent => write!(f, "Agent"),
        }
    }
}

/// One entry of the cross-turn conversation memory, a User/Agent pair per
/// completed turn.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}
