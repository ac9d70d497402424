use async_trait::async_trait;
use axon_core::{Error, Result};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

use crate::{Tool, ToolContext, ToolProvider, ToolSchema};

pub struct FsToolProvider;

impl ToolProvider for FsToolProvider {
    fn name(&self) -> &str {
        "fs"
    }

    fn tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![
            Arc::new(ReadFileTool),
            Arc::new(WriteFileTool),
            Arc::new(ListDirTool),
            Arc::new(MakeDirTool),
        ]
    }
}

fn expand_path(path: &str, workspace: &std::path::Path) -> PathBuf {
    if path.starts_with("~/") {
        dirs::home_dir()
            .map(|h| h.join(&path[2..]))
            .unwrap_or_else(|| PathBuf::from(path))
    } else if path.starts_with('/') {
        PathBuf::from(path)
    } else {
        workspace.join(path)
    }
}

fn require_str<'a>(params: &'a Value, key: &str) -> Result<&'a str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::Validation(format!("Missing required parameter: {}", key)))
}

// ============ fs.read_file ============

// File tools report missing paths and read failures as string results, not
// transport faults. The controller treats them as soft errors.

pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "fs.read_file",
            description: "Read content of a file",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Absolute path to the file"
                    }
                },
                "required": ["path"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_str(params, "path").map(|_| ())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let path_str = require_str(&params, "path")?;
        let path = expand_path(path_str, &ctx.workspace);

        if !path.exists() || !path.is_file() {
            return Ok(json!(format!("Error: File not found: {}", path_str)));
        }

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(json!(content)),
            Err(e) => Ok(json!(format!("Error reading file: {}", e))),
        }
    }
}

// ============ fs.write_file ============

pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "fs.write_file",
            description: "Write content to a file",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Absolute path to the file"
                    },
                    "content": {
                        "type": "string",
                        "description": "Content to write"
                    }
                },
                "required": ["path", "content"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_str(params, "path")?;
        require_str(params, "content")?;
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let path_str = require_str(&params, "path")?;
        let content = require_str(&params, "content")?;
        let path = expand_path(path_str, &ctx.workspace);

        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return Ok(json!(format!("Error writing file: {}", e)));
            }
        }

        match tokio::fs::write(&path, content).await {
            Ok(()) => Ok(json!(format!("Successfully wrote to {}", path_str))),
            Err(e) => Ok(json!(format!("Error writing file: {}", e))),
        }
    }
}

// ============ fs.list_dir ============

pub struct ListDirTool;

#[async_trait]
impl Tool for ListDirTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "fs.list_dir",
            description: "List files in a directory",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Absolute path to the directory"
                    }
                },
                "required": ["path"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_str(params, "path").map(|_| ())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let path_str = require_str(&params, "path")?;
        let path = expand_path(path_str, &ctx.workspace);

        if !path.is_dir() {
            return Ok(json!(format!("Error: Directory not found: {}", path_str)));
        }

        let mut read_dir = match tokio::fs::read_dir(&path).await {
            Ok(rd) => rd,
            Err(e) => return Ok(json!(format!("Error listing directory: {}", e))),
        };

        let mut items = Vec::new();
        loop {
            match read_dir.next_entry().await {
                Ok(Some(entry)) => items.push(entry.file_name().to_string_lossy().to_string()),
                Ok(None) => break,
                Err(e) => return Ok(json!(format!("Error listing directory: {}", e))),
            }
        }
        items.sort();
        Ok(json!(items.join("\n")))
    }
}

// ============ fs.make_dir ============

pub struct MakeDirTool;

#[async_trait]
impl Tool for MakeDirTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "fs.make_dir",
            description: "Create a directory, including parents",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Absolute path to the directory"
                    }
                },
                "required": ["path"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_str(params, "path").map(|_| ())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let path_str = require_str(&params, "path")?;
        let path = expand_path(path_str, &ctx.workspace);

        match tokio::fs::create_dir_all(&path).await {
            Ok(()) => Ok(json!(format!("Successfully created directory {}", path_str))),
            Err(e) => Ok(json!(format!("Error creating directory: {}", e))),
        }
    }
}
