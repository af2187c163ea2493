use super::{Args, Tool, ToolError, required_str};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

/// Resolve `path` against an optional root directory.
fn resolve(root: Option<&Path>, path: &str) -> PathBuf {
    match root {
        Some(root) => root.join(path),
        None => PathBuf::from(path),
    }
}

/// Reads a UTF-8 file and returns its contents.
#[derive(Debug, Default)]
pub struct ReadFileTool {
    root: Option<PathBuf>,
}

impl ReadFileTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `root`.
    pub fn within(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }
}

impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a text file and return its contents."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "path": { "type": "string" } },
            "required": ["path"]
        })
    }

    fn call(&self, args: Args) -> Result<Value, ToolError> {
        let path = resolve(self.root.as_deref(), required_str(&args, "path")?);
        Ok(Value::String(std::fs::read_to_string(path)?))
    }
}

/// Writes a file, creating parent directories as needed.
#[derive(Debug, Default)]
pub struct WriteFileTool {
    root: Option<PathBuf>,
}

impl WriteFileTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn within(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }
}

impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write text to a file, replacing any existing contents."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "content": { "type": "string" }
            },
            "required": ["path", "content"]
        })
    }

    fn call(&self, args: Args) -> Result<Value, ToolError> {
        let path = resolve(self.root.as_deref(), required_str(&args, "path")?);
        let content = required_str(&args, "content")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(json!({ "written": content.len() }))
    }
}

/// Lists the entries of a directory.
#[derive(Debug, Default)]
pub struct ListDirTool {
    root: Option<PathBuf>,
}

impl ListDirTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn within(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }
}

impl Tool for ListDirTool {
    fn name(&self) -> &str {
        "list_dir"
    }

    fn description(&self) -> &str {
        "List the entries of a directory."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "path": { "type": "string" } },
            "required": ["path"]
        })
    }

    fn call(&self, args: Args) -> Result<Value, ToolError> {
        let path = resolve(self.root.as_deref(), required_str(&args, "path")?);
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            entries.push(entry.path().display().to_string());
        }
        entries.sort();
        Ok(json!(entries))
    }
}
