//! Blocking client for OpenAI-compatible `/chat/completions` endpoints.

use crate::message::{Message, TokenUsage, ToolCall};
use crate::model::{ChatModel, ModelConfig, ModelError, ModelResponse, ToolSchema};
use serde_json::{Value, json};
use ureq::Agent;

pub struct OpenAiChat {
    config: ModelConfig,
    http: Agent,
}

impl OpenAiChat {
    pub fn new(config: ModelConfig) -> Self {
        let http: Agent = Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self { config, http }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }
}

impl ChatModel for OpenAiChat {
    fn invoke(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<ModelResponse, ModelError> {
        let url = format!("{}/chat/completions", self.config.endpoint());
        let body = request_body(&self.config, messages, tools);

        tracing::debug!(
            model = %self.config.model_name,
            messages = messages.len(),
            tools = tools.len(),
            "sending chat completion"
        );

        let mut request = self.http.post(&url);
        if let Some(key) = &self.config.api_key {
            request = request.header("Authorization", &format!("Bearer {key}"));
        }
        let mut response = request.send_json(&body)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            return Err(ModelError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let payload: Value = response.body_mut().read_json()?;
        let parsed = parse_response(&payload)?;

        tracing::debug!(
            tool_calls = parsed.tool_calls.len(),
            total_tokens = parsed.total_tokens(),
            "chat completion received"
        );
        Ok(parsed)
    }
}

fn request_body(config: &ModelConfig, messages: &[Message], tools: &[ToolSchema]) -> Value {
    let mut body = json!({
        "model": config.model_name,
        "temperature": config.temperature,
        "messages": messages.iter().map(wire_message).collect::<Vec<_>>(),
    });

    if !tools.is_empty() {
        body["tools"] = tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect();
    }
    body
}

fn wire_message(message: &Message) -> Value {
    match message {
        Message::Assistant {
            content,
            tool_calls,
        } if !tool_calls.is_empty() => {
            let calls: Vec<Value> = tool_calls
                .iter()
                .map(|c| {
                    json!({
                        "id": c.id,
                        "type": "function",
                        "function": { "name": c.name, "arguments": c.arguments },
                    })
                })
                .collect();
            json!({
                "role": "assistant",
                "content": if content.is_empty() { Value::Null } else { json!(content) },
                "tool_calls": calls,
            })
        }
        Message::Tool {
            content,
            tool_call_id,
            name,
        } => json!({
            "role": "tool",
            "content": content,
            "tool_call_id": tool_call_id,
            "name": name,
        }),
        other => json!({ "role": other.role(), "content": other.content() }),
    }
}

fn parse_response(payload: &Value) -> Result<ModelResponse, ModelError> {
    let message = payload["choices"]
        .as_array()
        .and_then(|c| c.first())
        .map(|choice| &choice["message"])
        .ok_or_else(|| ModelError::InvalidResponse("no choices in response".into()))?;

    let content = message["content"].as_str().unwrap_or_default().to_string();

    let mut tool_calls = Vec::new();
    if let Some(calls) = message["tool_calls"].as_array() {
        for call in calls {
            let id = call["id"]
                .as_str()
                .ok_or_else(|| ModelError::InvalidResponse("tool call without id".into()))?;
            let name = call["function"]["name"]
                .as_str()
                .ok_or_else(|| ModelError::InvalidResponse("tool call without name".into()))?;
            // Arguments stay raw; the tool step decides what to do with bad JSON.
            let arguments = match &call["function"]["arguments"] {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            tool_calls.push(ToolCall::new(id, name, arguments));
        }
    }

    let usage = payload.get("usage").filter(|u| u.is_object()).map(|u| TokenUsage {
        prompt_tokens: u["prompt_tokens"].as_u64().unwrap_or(0),
        completion_tokens: u["completion_tokens"].as_u64().unwrap_or(0),
        total_tokens: u["total_tokens"].as_u64().unwrap_or(0),
    });

    Ok(ModelResponse {
        content,
        tool_calls,
        usage,
    })
}
