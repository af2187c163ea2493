use super::{Args, Tool, ToolError, required_str};
use serde_json::{Value, json};
use std::time::Duration;
use ureq::Agent;

/// Sends a GET request and returns the response body as a string.
pub struct HttpGetTool {
    http: Agent,
}

impl HttpGetTool {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(5))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();

        Self {
            http: config.into(),
        }
    }
}

impl Default for HttpGetTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for HttpGetTool {
    fn name(&self) -> &str {
        "http_get"
    }

    fn description(&self) -> &str {
        "Fetch a URL with an HTTP GET request and return the response body."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "url": { "type": "string" } },
            "required": ["url"]
        })
    }

    fn call(&self, args: Args) -> Result<Value, ToolError> {
        let url = required_str(&args, "url")?;
        let body: String = self.http.get(url).call()?.body_mut().read_to_string()?;
        Ok(Value::String(body))
    }
}
