use crate::message::{Message, ToolCall};
use serde::{Deserialize, Serialize};

/// State threaded through a [`crate::Graph`].
///
/// Steps never return a full state. They return an `Update` naming only the
/// fields they change, and the runner folds it in with [`GraphState::merge`].
/// Fields absent from the update must be left as they were.
pub trait GraphState: Clone + 'static {
    type Update;

    fn merge(&mut self, update: Self::Update);
}

/// State of one agent run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub user_query: String,
    pub instructions: String,
    pub messages: Vec<Message>,
    /// Calls requested by the last model turn. Empty means none are pending.
    pub current_tool_calls: Vec<ToolCall>,
    pub session_id: String,
    pub total_tokens: u64,
}

impl AgentState {
    pub fn has_pending_tool_calls(&self) -> bool {
        !self.current_tool_calls.is_empty()
    }

    /// The content of the last assistant entry, if any.
    pub fn last_answer(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(|m| match m {
            Message::Assistant { content, .. } => Some(content.as_str()),
            _ => None,
        })
    }
}

/// Partial update to an [`AgentState`]. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentUpdate {
    pub user_query: Option<String>,
    pub instructions: Option<String>,
    pub messages: Option<Vec<Message>>,
    pub current_tool_calls: Option<Vec<ToolCall>>,
    pub session_id: Option<String>,
    pub total_tokens: Option<u64>,
}

impl AgentUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Some(messages);
        self
    }

    pub fn tool_calls(mut self, calls: Vec<ToolCall>) -> Self {
        self.current_tool_calls = Some(calls);
        self
    }

    /// Clear pending tool calls.
    pub fn clear_tool_calls(self) -> Self {
        self.tool_calls(Vec::new())
    }

    pub fn session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    pub fn total_tokens(mut self, total: u64) -> Self {
        self.total_tokens = Some(total);
        self
    }
}

impl GraphState for AgentState {
    type Update = AgentUpdate;

    fn merge(&mut self, update: AgentUpdate) {
        if let Some(v) = update.user_query {
            self.user_query = v;
        }
        if let Some(v) = update.instructions {
            self.instructions = v;
        }
        if let Some(v) = update.messages {
            self.messages = v;
        }
        if let Some(v) = update.current_tool_calls {
            self.current_tool_calls = v;
        }
        if let Some(v) = update.session_id {
            self.session_id = v;
        }
        if let Some(v) = update.total_tokens {
            self.total_tokens = v;
        }
    }
}
