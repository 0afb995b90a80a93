use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{mpsc, Mutex, OwnedMutexGuard};
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

use reagent_core::{
    parse_observation, parse_plan, parse_reaction, strip_stop_markers, AgentError, ChannelSink,
    CompletionModel, CompletionRequest, EventSink, Frame, Message, NullSink, PromptTemplate, Role,
    Step, Tool, ToolRegistry, ToolSpec, Value,
};

use crate::checkpoint::{CheckpointStore, InMemoryCheckpointer};
use crate::config::GraphConfig;
use crate::prompts::{DEFAULT_OBSERVER_PROMPT, DEFAULT_PLANNER_PROMPT, DEFAULT_REACT_PROMPT};
use crate::state::{TurnState, TurnUpdate};

const MAX_ITERATIONS_MESSAGE: &str = "MAX AGENT ITERATIONS EXCEEDED";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Node {
    Planner,
    Agent,
    Tools,
    Observer,
    End,
}

#[derive(Clone, Copy)]
enum Channel {
    Planner,
    Agent,
    Observer,
}

struct Prompts {
    planner: PromptTemplate,
    react: PromptTemplate,
    observer: PromptTemplate,
}

/// The four-node agent execution graph: Planner → Agent → (Tools →
/// Observer → Agent)* until a `Finish` step or budget exhaustion ends the
/// turn. Cheap to clone; all collaborators are shared and read-only past
/// construction, only `TurnState` mutates during a turn.
#[derive(Clone)]
pub struct AgentGraph {
    llm: Arc<dyn CompletionModel>,
    tools: Arc<ToolRegistry>,
    checkpointer: Arc<dyn CheckpointStore>,
    config: Arc<GraphConfig>,
    prompts: Arc<Prompts>,
    session_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl AgentGraph {
    pub fn builder() -> AgentGraphBuilder {
        AgentGraphBuilder {
            llm: None,
            tools: Vec::new(),
            registry: None,
            checkpointer: None,
            config: GraphConfig::default(),
            planner_prompt: PromptTemplate::new(DEFAULT_PLANNER_PROMPT),
            react_prompt: PromptTemplate::new(DEFAULT_REACT_PROMPT),
            observer_prompt: PromptTemplate::new(DEFAULT_OBSERVER_PROMPT),
        }
    }

    /// Runs one full turn to completion and returns the final state. An
    /// empty `output` on an `Ok` result means the iteration budget ran out
    /// before the model produced a final answer.
    pub async fn invoke(&self, session_id: &str, input: &str) -> Result<TurnState, AgentError> {
        let _guard = self.lock_session(session_id).await;
        let mut state = self.load_state(session_id).await;
        state.input = input.to_string();
        self.run_turn(&mut state, &NullSink).await?;
        self.save_state(session_id, &state).await;
        Ok(state)
    }

    /// Runs one turn in the background, yielding frames as node activity
    /// and token chunks are produced. Dropping the stream stops frame
    /// delivery but lets the turn finish and persist.
    pub fn stream(&self, session_id: &str, input: &str) -> UnboundedReceiverStream<Frame> {
        let (tx, rx) = mpsc::unbounded_channel();
        let graph = self.clone();
        let session_id = session_id.to_string();
        let input = input.to_string();
        tokio::spawn(async move {
            let sink = ChannelSink::new(tx);
            let _guard = graph.lock_session(&session_id).await;
            let mut state = graph.load_state(&session_id).await;
            state.input = input;
            match graph.run_turn(&mut state, &sink).await {
                Ok(()) => graph.save_state(&session_id, &state).await,
                Err(err) => {
                    tracing::error!(error = %err, session_id, "turn failed mid-stream");
                    sink.emit(Frame::Error {
                        error: err.to_string(),
                    });
                }
            }
        });
        UnboundedReceiverStream::new(rx)
    }

    pub fn tool_catalog(&self) -> Vec<ToolSpec> {
        self.tools.specs().to_vec()
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    async fn run_turn(
        &self,
        state: &mut TurnState,
        sink: &dyn EventSink,
    ) -> Result<(), AgentError> {
        let mut node = Node::Planner;
        loop {
            match node {
                Node::Planner => {
                    let update = self.planner_node(state, sink).await?;
                    state.apply(update);
                    node = Node::Agent;
                }
                Node::Agent => {
                    let update = self.agent_node(state, sink).await?;
                    state.apply(update);
                    state.iterations += 1;
                    node = self.route_after_agent(state, sink);
                }
                Node::Tools => {
                    let update = self.tool_node(state, sink).await;
                    state.apply(update);
                    node = Node::Observer;
                }
                Node::Observer => {
                    let update = self.observer_node(state, sink).await?;
                    state.apply(update);
                    node = Node::Agent;
                }
                Node::End => return Ok(()),
            }
        }
    }

    fn route_after_agent(&self, state: &mut TurnState, sink: &dyn EventSink) -> Node {
        if state.iterations > self.config.max_iterations {
            tracing::warn!(
                iterations = state.iterations,
                max = self.config.max_iterations,
                "iteration budget exhausted, ending turn without a final answer"
            );
            sink.emit(Frame::Error {
                error: MAX_ITERATIONS_MESSAGE.to_string(),
            });
            state.iterations = 0;
            return Node::End;
        }
        match state.steps.last() {
            Some(Step::Error { .. }) => Node::Agent,
            Some(Step::Finish { .. }) => {
                state.iterations = 0;
                Node::End
            }
            _ => Node::Tools,
        }
    }

    async fn planner_node(
        &self,
        state: &TurnState,
        sink: &dyn EventSink,
    ) -> Result<TurnUpdate, AgentError> {
        let mut vars = HashMap::new();
        vars.insert("tools".to_string(), Value::String(self.tools.catalog_json()));
        vars.insert(
            "messages".to_string(),
            Value::String(render_messages(&state.messages)),
        );
        vars.insert("input".to_string(), Value::String(state.input.clone()));
        let prompt = self.prompts.planner.render(&vars);

        let text = self
            .stream_completion(
                CompletionRequest::new(prompt, self.config.stop_markers.clone()),
                Channel::Planner,
                sink,
            )
            .await?;

        // New turn: overwrite the plan, clear the trace and any previous
        // final answer.
        Ok(TurnUpdate {
            plan: Some(parse_plan(&text)),
            output: Some(String::new()),
            steps: Some(Vec::new()),
            messages: Vec::new(),
        })
    }

    async fn agent_node(
        &self,
        state: &TurnState,
        sink: &dyn EventSink,
    ) -> Result<TurnUpdate, AgentError> {
        let mut vars = HashMap::new();
        vars.insert("tools".to_string(), Value::String(self.tools.catalog_json()));
        vars.insert(
            "tool_names".to_string(),
            Value::String(self.tools.names().join(", ")),
        );
        vars.insert(
            "messages".to_string(),
            Value::String(render_messages(&state.messages)),
        );
        vars.insert("input".to_string(), Value::String(state.input.clone()));
        vars.insert("plan".to_string(), Value::String(state.plan.clone()));
        vars.insert(
            "scratchpad".to_string(),
            Value::String(build_scratchpad(&state.steps)),
        );
        let prompt = self.prompts.react.render(&vars);

        let text = self
            .stream_completion(
                CompletionRequest::new(prompt, self.config.stop_markers.clone()),
                Channel::Agent,
                sink,
            )
            .await?;

        let step = parse_reaction(&text, self.tools.names(), &self.config.stop_markers);
        if let Step::Error { error, .. } = &step {
            sink.emit(Frame::Error {
                error: error.clone(),
            });
        }

        let mut update = TurnUpdate {
            steps: Some(vec![step.clone()]),
            ..Default::default()
        };
        if let Step::Finish { output, .. } = step {
            update.messages = vec![
                Message::new(Role::User, state.input.clone()),
                Message::new(Role::Agent, output.clone()),
            ];
            update.output = Some(output);
        }
        Ok(update)
    }

    async fn tool_node(&self, state: &TurnState, sink: &dyn EventSink) -> TurnUpdate {
        let Some(Step::Action {
            action,
            action_input,
            ..
        }) = state.steps.last()
        else {
            return self.protocol_error("Tool node called without a pending action", sink);
        };
        let step = self.tools.dispatch(action, action_input, sink).await;
        TurnUpdate {
            steps: Some(vec![step]),
            ..Default::default()
        }
    }

    async fn observer_node(
        &self,
        state: &TurnState,
        sink: &dyn EventSink,
    ) -> Result<TurnUpdate, AgentError> {
        let raw_result = match state.steps.last() {
            Some(Step::ToolOutput { tool_output, .. }) => tool_output.clone(),
            Some(Step::Error { error, .. }) => format!("Error: {error}"),
            _ => {
                return Ok(self.protocol_error("Reviewer node called with no Observation!", sink));
            }
        };
        let Some(Step::Action {
            thought,
            action,
            action_input,
            ..
        }) = state
            .steps
            .len()
            .checked_sub(2)
            .and_then(|i| state.steps.get(i))
        else {
            return Ok(self.protocol_error("Reviewer node called with no Action information", sink));
        };

        let mut vars = HashMap::new();
        vars.insert("thought".to_string(), Value::String(thought.clone()));
        vars.insert("action".to_string(), Value::String(action.clone()));
        vars.insert(
            "action_input".to_string(),
            Value::String(format!("< {action_input} >")),
        );
        vars.insert("tool_output".to_string(), Value::String(raw_result));
        let prompt = self.prompts.observer.render(&vars);

        // The observer is free-form; no stop markers bound this call.
        let text = self
            .stream_completion(
                CompletionRequest::new(prompt, Vec::new()),
                Channel::Observer,
                sink,
            )
            .await?;

        Ok(TurnUpdate {
            steps: Some(vec![parse_observation(&text)]),
            ..Default::default()
        })
    }

    fn protocol_error(&self, message: &str, sink: &dyn EventSink) -> TurnUpdate {
        tracing::warn!(message, "node invoked with a malformed trace");
        sink.emit(Frame::Error {
            error: message.to_string(),
        });
        TurnUpdate {
            steps: Some(vec![Step::Error {
                error: message.to_string(),
                log: None,
            }]),
            ..Default::default()
        }
    }

    /// Consumes the model's token stream, projecting chunks onto the sink
    /// while accumulating the full reply for parsing. Agent chunks are
    /// buffered until they are confirmed not to open a stop marker, then
    /// emitted with markers stripped; planner and observer chunks pass
    /// through as-is.
    async fn stream_completion(
        &self,
        request: CompletionRequest,
        channel: Channel,
        sink: &dyn EventSink,
    ) -> Result<String, AgentError> {
        let message_id = Uuid::new_v4().to_string();
        let mut stream = self.llm.stream(request);
        let mut text = String::new();
        let mut buffer = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            text.push_str(&chunk);
            match channel {
                Channel::Planner => sink.emit(Frame::Planner {
                    content: chunk,
                    message_id: message_id.clone(),
                }),
                Channel::Observer => sink.emit(Frame::Observer {
                    content: chunk,
                    message_id: message_id.clone(),
                }),
                Channel::Agent => {
                    buffer.push_str(&chunk);
                    let may_open_marker = self
                        .config
                        .stop_markers
                        .iter()
                        .any(|marker| marker.contains(chunk.as_str()));
                    if !may_open_marker {
                        sink.emit(Frame::Agent {
                            content: strip_stop_markers(&buffer, &self.config.stop_markers),
                            message_id: message_id.clone(),
                        });
                        buffer.clear();
                    }
                }
            }
        }
        Ok(text)
    }

    async fn lock_session(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.session_locks.lock().await;
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    async fn load_state(&self, session_id: &str) -> TurnState {
        match self.checkpointer.load(session_id).await {
            Ok(Some(state)) => state,
            Ok(None) => TurnState::default(),
            Err(err) => {
                tracing::warn!(error = %err, session_id, "checkpoint load failed, starting fresh");
                TurnState::default()
            }
        }
    }

    async fn save_state(&self, session_id: &str, state: &TurnState) {
        if let Err(err) = self.checkpointer.save(session_id, state).await {
            tracing::warn!(error = %err, session_id, "checkpoint save failed, turn not persisted");
        }
    }
}

fn render_messages(messages: &[Message]) -> String {
    let mut out = String::new();
    for message in messages {
        out.push_str(&format!("{}: {}\n", message.role, message.content));
    }
    out
}

fn build_scratchpad(steps: &[Step]) -> String {
    let mut out = String::new();
    for step in steps {
        match step {
            Step::Action { scratchpad, .. } => out.push_str(scratchpad),
            Step::Observation { observation, .. } => {
                out.push_str(&format!("Observation: < {observation} >\n\n"));
            }
            Step::Error { error, .. } => {
                out.push_str(&format!("Error: {error}\n\n"));
            }
            Step::ToolOutput { .. } | Step::Finish { .. } => {}
        }
    }
    out
}

pub struct AgentGraphBuilder {
    llm: Option<Arc<dyn CompletionModel>>,
    tools: Vec<Arc<dyn Tool>>,
    registry: Option<ToolRegistry>,
    checkpointer: Option<Arc<dyn CheckpointStore>>,
    config: GraphConfig,
    planner_prompt: PromptTemplate,
    react_prompt: PromptTemplate,
    observer_prompt: PromptTemplate,
}

impl AgentGraphBuilder {
    pub fn llm(mut self, llm: Arc<dyn CompletionModel>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Registers a tool only when `enabled` is true, for tools whose
    /// backing service must be confirmed reachable at startup.
    pub fn tool_if(self, enabled: bool, tool: Arc<dyn Tool>) -> Self {
        if enabled {
            self.tool(tool)
        } else {
            self
        }
    }

    /// Uses a pre-assembled registry instead of individually added tools.
    pub fn registry(mut self, registry: ToolRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn checkpointer(mut self, checkpointer: Arc<dyn CheckpointStore>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    pub fn config(mut self, config: GraphConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    pub fn planner_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.planner_prompt = prompt;
        self
    }

    pub fn react_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.react_prompt = prompt;
        self
    }

    pub fn observer_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.observer_prompt = prompt;
        self
    }

    pub fn build(self) -> Result<AgentGraph, AgentError> {
        let llm = self
            .llm
            .ok_or_else(|| AgentError::InvalidConfig("completion model is required".to_string()))?;

        let registry = match self.registry {
            Some(registry) => {
                if !self.tools.is_empty() {
                    return Err(AgentError::InvalidConfig(
                        "pass either a registry or individual tools, not both".to_string(),
                    ));
                }
                registry
            }
            None => {
                let mut builder = ToolRegistry::builder();
                for tool in self.tools {
                    builder = builder.tool(tool);
                }
                builder.build()?
            }
        };

        let checkpointer = self.checkpointer.unwrap_or_else(|| {
            tracing::info!("no checkpoint store configured, sessions are in-memory only");
            Arc::new(InMemoryCheckpointer::new())
        });

        Ok(AgentGraph {
            llm,
            tools: Arc::new(registry),
            checkpointer,
            config: Arc::new(self.config),
            prompts: Arc::new(Prompts {
                planner: self.planner_prompt,
                react: self.react_prompt,
                observer: self.observer_prompt,
            }),
            session_locks: Arc::new(Mutex::new(HashMap::new())),
        })
    }
}
