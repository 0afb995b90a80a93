use serde::{Deserialize, Serialize};

use reagent_core::{Message, Step};

use crate::reducer::{BoundedAppend, ClearingAppend};

/// Conversation memory cap. Trimming always drops from the front.
pub const MESSAGE_WINDOW: usize = 10;

/// The full mutable record for one conversational turn. `messages` persists
/// across turns; `steps` and `plan` are turn-scoped and reset by the
/// planner. The iteration counter lives here rather than on any executor
/// instance so concurrent sessions never share it.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct TurnState {
    pub input: String,
    /// Final answer once produced; empty while the turn is in flight and
    /// after budget exhaustion.
    pub output: String,
    pub messages: Vec<Message>,
    pub steps: Vec<Step>,
    pub plan: String,
    pub iterations: u32,
}

/// Partial update returned by a node. Absent fields leave the state
/// untouched; the executor folds present fields through the reducers.
#[derive(Clone, Debug, Default)]
pub struct TurnUpdate {
    pub plan: Option<String>,
    pub output: Option<String>,
    pub steps: Option<Vec<Step>>,
    pub messages: Vec<Message>,
}

impl TurnState {
    pub fn apply(&mut self, update: TurnUpdate) {
        if let Some(plan) = update.plan {
            self.plan = plan;
        }
        if let Some(output) = update.output {
            self.output = output;
        }
        if let Some(steps) = update.steps {
            self.steps = ClearingAppend::merge(&self.steps, steps);
        }
        self.messages = BoundedAppend::merge(&self.messages, update.messages, MESSAGE_WINDOW);
    }
}
