//! Tools the model can call, and the registry the agent resolves them from.

pub mod command;
pub mod file;
pub mod http;

pub use command::ShellTool;
pub use file::{ListDirTool, ReadFileTool, WriteFileTool};
pub use http::HttpGetTool;

use crate::model::ToolSchema;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// Keyword-style arguments passed to a tool.
pub type Args = Map<String, Value>;

/// A named capability the model can request.
pub trait Tool: Send + Sync {
    /// Unique within one agent's tool set.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema for the arguments object.
    fn parameters(&self) -> Value;

    fn call(&self, args: Args) -> Result<Value, ToolError>;

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("http: {0}")]
    Http(#[from] ureq::Error),
    #[error("{0}")]
    Failed(String),
}

impl ToolError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ToolError::InvalidArguments(msg.into())
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        ToolError::Failed(msg.into())
    }
}

/// Fetch a required string argument.
pub fn required_str<'a>(args: &'a Args, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::invalid(format!("missing string argument '{key}'")))
}

/// Parse raw tool-call arguments into an argument map.
///
/// Empty text, malformed JSON, and JSON that is not an object all degrade to
/// an empty map. Returns whether the input was usable alongside the map.
pub fn parse_arguments(raw: &str) -> (Args, bool) {
    if raw.trim().is_empty() {
        return (Args::new(), true);
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => (map, true),
        _ => (Args::new(), false),
    }
}

/// Serialize a tool result into transcript content.
pub fn render_result(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}"))
}

/// Adapts a closure into a [`Tool`].
pub struct FnTool<F> {
    name: String,
    description: String,
    parameters: Value,
    f: F,
}

impl<F> FnTool<F>
where
    F: Fn(Args) -> Result<Value, ToolError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value, f: F) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            f,
        }
    }
}

impl<F> Tool for FnTool<F>
where
    F: Fn(Args) -> Result<Value, ToolError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        self.parameters.clone()
    }

    fn call(&self, args: Args) -> Result<Value, ToolError> {
        (self.f)(args)
    }
}

/// The fixed set of tools available to one agent, resolved by exact name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. If the name is already taken, the first registration is kept
    /// and the newcomer is dropped.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        if self.get(tool.name()).is_some() {
            tracing::warn!(tool = tool.name(), "duplicate tool name, keeping the first");
            return;
        }
        self.tools.push(tool);
    }

    pub fn with<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.register(Arc::new(tool));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|t| t.schema()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl FromIterator<Arc<dyn Tool>> for ToolRegistry {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Tool>>>(iter: I) -> Self {
        let mut registry = ToolRegistry::new();
        for tool in iter {
            registry.register(tool);
        }
        registry
    }
}
