use crate::message::{Message, TokenUsage, ToolCall};
use serde::Serialize;
use serde_json::Value;
use std::env;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Function schema advertised to the model for one tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// What one model invocation produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<TokenUsage>,
}

impl ModelResponse {
    /// A plain text answer with no tool calls and no usage report.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_tool_calls(mut self, calls: Vec<ToolCall>) -> Self {
        self.tool_calls = calls;
        self
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Tokens to charge for this invocation; zero when usage is unavailable.
    pub fn total_tokens(&self) -> u64 {
        self.usage.map(|u| u.total_tokens).unwrap_or(0)
    }
}

/// A chat model that turns a transcript into the next assistant turn.
///
/// Implementations are blocking. Tool-call parsing happens here, so the
/// agent only ever sees structured [`ToolCall`]s.
pub trait ChatModel: Send + Sync {
    fn invoke(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<ModelResponse, ModelError>;
}

#[derive(Debug, Error)]
pub enum ModelError {
    /// Connection, DNS, TLS or timeout problems.
    #[error("transport: {0}")]
    Transport(String),
    /// The endpoint answered with a non-success status.
    #[error("status {code}: {body}")]
    Status { code: u16, body: String },
    /// The endpoint answered, but not with something we understand.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<ureq::Error> for ModelError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::StatusCode(code) => ModelError::Status {
                code,
                body: String::new(),
            },
            other => ModelError::Transport(other.to_string()),
        }
    }
}

/// Connection and sampling settings for a model client.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub model_name: String,
    pub temperature: f32,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl ModelConfig {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            temperature: DEFAULT_TEMPERATURE,
            base_url: None,
            api_key: None,
            timeout: Duration::from_secs(60),
        }
    }

    /// Like [`ModelConfig::new`], picking up `OPENAI_API_KEY` and
    /// `OPENAI_BASE_URL` from the environment when they are set.
    pub fn from_env(model_name: impl Into<String>) -> Self {
        let mut config = Self::new(model_name);
        config.api_key = env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
        config.base_url = env::var("OPENAI_BASE_URL").ok().filter(|u| !u.is_empty());
        config
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The configured base URL without a trailing slash.
    pub fn endpoint(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }
}
