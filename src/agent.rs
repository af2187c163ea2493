use crate::graph::{Graph, GraphError, Node};
use crate::message::Message;
use crate::model::{ChatModel, ModelConfig, ToolSchema};
use crate::openai::OpenAiChat;
use crate::run::Run;
use crate::runner::{RunError, Runner};
use crate::session::SessionMemory;
use crate::state::{AgentState, AgentUpdate};
use crate::step::{Step, StepError, StepResult};
use crate::tools::{self, Tool, ToolRegistry};
use std::sync::Arc;

pub const MESSAGE_PREP: &str = "message_prep";
pub const LLM_PROCESSOR: &str = "llm_processor";
pub const TOOL_EXECUTOR: &str = "tool_executor";

/// Step budget for one `invoke`: 100 applied steps, roughly 49 tool rounds.
pub const DEFAULT_MAX_STEPS: usize = 100;

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// Seeds an empty transcript with the instructions, then appends the query.
struct PrepareMessages;

impl Step<AgentState> for PrepareMessages {
    fn name(&self) -> &'static str {
        MESSAGE_PREP
    }

    fn run(&self, state: &AgentState) -> StepResult<AgentState> {
        let mut messages = state.messages.clone();
        if messages.is_empty() {
            messages.push(Message::system(&state.instructions));
        }
        messages.push(Message::user(&state.user_query));

        Ok(AgentUpdate::new()
            .messages(messages)
            .session_id(&state.session_id))
    }
}

/// Sends the transcript to the model and records its turn.
struct InvokeModel {
    model: Arc<dyn ChatModel>,
    schemas: Vec<ToolSchema>,
}

impl Step<AgentState> for InvokeModel {
    fn name(&self) -> &'static str {
        LLM_PROCESSOR
    }

    fn run(&self, state: &AgentState) -> StepResult<AgentState> {
        let response = self.model.invoke(&state.messages, &self.schemas)?;
        let total = state.total_tokens.saturating_add(response.total_tokens());

        let mut messages = state.messages.clone();
        messages.push(Message::assistant(
            response.content,
            response.tool_calls.clone(),
        ));

        Ok(AgentUpdate::new()
            .messages(messages)
            .tool_calls(response.tool_calls)
            .session_id(&state.session_id)
            .total_tokens(total))
    }
}

/// Runs every pending tool call and appends the results.
struct ExecuteTools {
    tools: Arc<ToolRegistry>,
}

impl Step<AgentState> for ExecuteTools {
    fn name(&self) -> &'static str {
        TOOL_EXECUTOR
    }

    fn run(&self, state: &AgentState) -> StepResult<AgentState> {
        let mut messages = state.messages.clone();

        for call in &state.current_tool_calls {
            let (args, well_formed) = tools::parse_arguments(&call.arguments);
            if !well_formed {
                tracing::warn!(
                    tool = %call.name,
                    call_id = %call.id,
                    "malformed tool arguments, calling with none"
                );
            }

            // Unknown tools get no transcript entry.
            let Some(tool) = self.tools.get(&call.name) else {
                tracing::warn!(tool = %call.name, call_id = %call.id, "unknown tool requested");
                continue;
            };

            let result = tool.call(args).map_err(|e| StepError::Tool {
                name: call.name.clone(),
                message: e.to_string(),
            })?;
            tracing::debug!(tool = %call.name, call_id = %call.id, "tool call completed");

            messages.push(Message::tool(
                tools::render_result(&result),
                &call.id,
                &call.name,
            ));
        }

        Ok(AgentUpdate::new()
            .messages(messages)
            .clear_tool_calls()
            .session_id(&state.session_id))
    }
}

fn route_after_model(state: &AgentState) -> Node {
    if state.has_pending_tool_calls() {
        Node::Step(TOOL_EXECUTOR)
    } else {
        Node::End
    }
}

fn build_graph(model: Arc<dyn ChatModel>, tools: Arc<ToolRegistry>) -> Result<Graph<AgentState>, GraphError> {
    let schemas = tools.schemas();

    Graph::builder("agent")
        .add_step(PrepareMessages)
        .add_step(InvokeModel { model, schemas })
        .add_step(ExecuteTools { tools })
        .connect(Node::Entry, MESSAGE_PREP)
        .connect(MESSAGE_PREP, LLM_PROCESSOR)
        .connect_routed(
            LLM_PROCESSOR,
            [Node::Step(TOOL_EXECUTOR), Node::End],
            route_after_model,
        )
        .connect(TOOL_EXECUTOR, LLM_PROCESSOR)
        .build()
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// A tool-calling agent: prepare messages, call the model, run any requested
/// tools, and loop back to the model until it stops asking for tools.
pub struct Agent {
    instructions: String,
    tools: Arc<ToolRegistry>,
    runner: Runner<AgentState>,
    memory: Arc<SessionMemory<AgentState>>,
}

impl Agent {
    /// Build an agent backed by an OpenAI-compatible endpoint.
    ///
    /// `api_key` falls back to `OPENAI_API_KEY` and `base_url` to
    /// `OPENAI_BASE_URL` when not given.
    pub fn new(
        model_name: impl Into<String>,
        instructions: impl Into<String>,
        tools: Vec<Arc<dyn Tool>>,
        temperature: f32,
        base_url: Option<String>,
        api_key: Option<String>,
    ) -> Result<Self, GraphError> {
        let mut config = ModelConfig::from_env(model_name).with_temperature(temperature);
        if let Some(url) = base_url {
            config = config.with_base_url(url);
        }
        if let Some(key) = api_key {
            config = config.with_api_key(key);
        }
        Self::with_model(OpenAiChat::new(config), instructions, tools)
    }

    /// Build an agent around any [`ChatModel`].
    pub fn with_model(
        model: impl ChatModel + 'static,
        instructions: impl Into<String>,
        tools: Vec<Arc<dyn Tool>>,
    ) -> Result<Self, GraphError> {
        let tools: Arc<ToolRegistry> = Arc::new(tools.into_iter().collect());
        let graph = build_graph(Arc::new(model), Arc::clone(&tools))?;

        Ok(Self {
            instructions: instructions.into(),
            tools,
            runner: Runner::new(graph).with_max_steps(DEFAULT_MAX_STEPS),
            memory: Arc::new(SessionMemory::new()),
        })
    }

    /// Share a session store, e.g. between agents or with the caller.
    pub fn with_memory(mut self, memory: Arc<SessionMemory<AgentState>>) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.runner = self.runner.with_max_steps(max_steps);
        self
    }

    /// Log steps and failures through `tracing`.
    pub fn with_tracing(mut self) -> Self {
        self.runner = self.runner.with_tracing();
        self
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn memory(&self) -> &Arc<SessionMemory<AgentState>> {
        &self.memory
    }

    /// Run the agent on `query`.
    ///
    /// With a `session_id`, the last stored transcript for that session seeds
    /// this run and the resulting run replaces it. Without one, the run uses a
    /// throwaway id and nothing is read from or written to memory.
    pub fn invoke(&self, query: &str, session_id: Option<&str>) -> Result<Run<AgentState>, RunError> {
        let Some(id) = session_id else {
            let temp_id = format!("temp_session_{}", uuid::Uuid::new_v4());
            return self.runner.run(self.initial_state(query, &temp_id, Vec::new()));
        };

        self.memory.transact(id, |last| -> Result<Run<AgentState>, RunError> {
            let previous = last
                .as_ref()
                .map(|run| run.final_state().messages.clone())
                .unwrap_or_default();

            let run = self.runner.run(self.initial_state(query, id, previous))?;
            *last = Some(run.clone());
            Ok(run)
        })
    }

    fn initial_state(&self, query: &str, session_id: &str, messages: Vec<Message>) -> AgentState {
        AgentState {
            user_query: query.to_string(),
            instructions: self.instructions.clone(),
            messages,
            current_tool_calls: Vec::new(),
            session_id: session_id.to_string(),
            total_tokens: 0,
        }
    }
}
