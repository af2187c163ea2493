use super::{Args, Tool, ToolError, required_str};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::process::Command;

/// Runs a shell command via `sh -c` and reports its exit status and output.
#[derive(Debug, Default)]
pub struct ShellTool {
    dir: Option<PathBuf>,
}

impl ShellTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run commands in a specific directory.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }
}

impl Tool for ShellTool {
    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        "Run a shell command and return its exit status, stdout and stderr."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "command": { "type": "string" } },
            "required": ["command"]
        })
    }

    fn call(&self, args: Args) -> Result<Value, ToolError> {
        let cmd = required_str(&args, "command")?;
        let mut command = Command::new("sh");
        command.arg("-c").arg(cmd);
        if let Some(dir) = &self.dir {
            command.current_dir(dir);
        }
        let output = command.output()?;

        Ok(json!({
            "success": output.status.success(),
            "stdout": String::from_utf8_lossy(&output.stdout),
            "stderr": String::from_utf8_lossy(&output.stderr),
        }))
    }
}
