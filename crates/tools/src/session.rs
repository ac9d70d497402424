use async_trait::async_trait;
use axon_core::{Error, Result};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

use crate::{Tool, ToolContext, ToolProvider, ToolSchema};

pub struct SessionToolProvider;

impl ToolProvider for SessionToolProvider {
    fn name(&self) -> &str {
        "session"
    }

    fn tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![
            Arc::new(SaveContextTool),
            Arc::new(ResurrectTool),
            Arc::new(ReloadToolsTool),
        ]
    }
}

const LATEST_SNAPSHOT: &str = "context_latest.json";

fn state_dir(ctx: &ToolContext) -> std::path::PathBuf {
    ctx.workspace.join("state")
}

/// Depth-limited file tree summary, so a restored session knows where
/// things live without reading any file contents.
fn scan_directory_structure(root: &Path, depth: usize) -> String {
    fn walk(dir: &Path, level: usize, depth: usize, out: &mut Vec<String>) {
        if level >= depth {
            return;
        }
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        let mut names: Vec<_> = entries.flatten().collect();
        names.sort_by_key(|e| e.file_name());
        for entry in names {
            let name = entry.file_name().to_string_lossy().to_string();
            let indent = "  ".repeat(level);
            if entry.path().is_dir() {
                out.push(format!("{}{}/", indent, name));
                walk(&entry.path(), level + 1, depth, out);
            } else {
                out.push(format!("{}{}", indent, name));
            }
        }
    }

    if !root.exists() {
        return format!("Path not found: {}", root.display());
    }
    let mut out = Vec::new();
    walk(root, 0, depth, &mut out);
    if out.is_empty() {
        "(Empty Directory)".to_string()
    } else {
        out.join("\n")
    }
}

// ============ system.save_context ============

pub struct SaveContextTool;

#[async_trait]
impl Tool for SaveContextTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "system.save_context",
            description: "Save a snapshot of the current session context",
            parameters: json!({
                "type": "object",
                "properties": {
                    "summary": {"type": "string"},
                    "current_task_status": {"type": "string"},
                    "active_rules": {"type": "array", "items": {"type": "string"}},
                    "tech_stack": {"type": "array", "items": {"type": "string"}},
                    "project_paths": {"type": "object"}
                },
                "required": ["summary", "current_task_status"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        for key in ["summary", "current_task_status"] {
            if params.get(key).and_then(|v| v.as_str()).is_none() {
                return Err(Error::Validation(format!("Missing required parameter: {}", key)));
            }
        }
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let dir = state_dir(&ctx);
        tokio::fs::create_dir_all(&dir).await?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let snapshot = json!({
            "timestamp": timestamp,
            "summary": params.get("summary").cloned().unwrap_or(Value::Null),
            "current_task_status": params.get("current_task_status").cloned().unwrap_or(Value::Null),
            "active_rules": params.get("active_rules").cloned().unwrap_or_else(|| json!([])),
            "tech_stack": params.get("tech_stack").cloned().unwrap_or_else(|| json!([])),
            "project_paths": params.get("project_paths").cloned().unwrap_or_else(|| json!({})),
        });
        let content = serde_json::to_string_pretty(&snapshot)?;

        tokio::fs::write(dir.join(format!("context_{}.json", timestamp)), &content).await?;
        tokio::fs::write(dir.join(LATEST_SNAPSHOT), &content).await?;

        Ok(json!("[Context Saved] Snapshot written."))
    }
}

// ============ system.resurrect ============

/// Restore the latest context snapshot plus a workspace map. The
/// dispatcher also zeroes the session fatigue counter whenever this tool
/// is invoked.
pub struct ResurrectTool;

#[async_trait]
impl Tool for ResurrectTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "system.resurrect",
            description: "Restore the saved context snapshot and reset session fatigue",
            parameters: json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    fn validate(&self, _params: &Value) -> Result<()> {
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, _params: Value) -> Result<Value> {
        let dir = state_dir(&ctx);
        let latest_path = dir.join(LATEST_SNAPSHOT);

        let snapshot: Value = match tokio::fs::read_to_string(&latest_path).await {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|_| json!({})),
            Err(_) => json!({}),
        };

        let workspace = ctx.workspace.clone();
        let workspace_map = tokio::task::spawn_blocking(move || {
            scan_directory_structure(&workspace, 2)
        })
        .await
        .map_err(|e| Error::Tool(format!("Workspace scan failed: {}", e)))?;

        let response = format!(
            "=== SESSION RESTORED ===\n\n\
            [WORKSPACE] ({})\n{}\n\n\
            [RESTORED CONTEXT]\n\
            - Last Task: {}\n\
            - Active Rules: {}\n\
            - Tech Stack: {}\n\n\
            [READY] Fatigue counter reset. Waiting for command.",
            ctx.workspace.display(),
            workspace_map,
            snapshot
                .get("current_task_status")
                .and_then(|v| v.as_str())
                .unwrap_or("Ready"),
            snapshot.get("active_rules").cloned().unwrap_or_else(|| json!([])),
            snapshot.get("tech_stack").cloned().unwrap_or_else(|| json!([])),
        );

        Ok(json!(response))
    }
}

// ============ system.reload_tools ============

pub struct ReloadToolsTool;

#[async_trait]
impl Tool for ReloadToolsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "system.reload_tools",
            description: "Re-discover capability providers and swap the tool registry",
            parameters: json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    fn validate(&self, _params: &Value) -> Result<()> {
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, _params: Value) -> Result<Value> {
        let registry = ctx
            .registry
            .as_ref()
            .ok_or_else(|| Error::Tool("Registry handle not configured".to_string()))?;
        let count = registry.reload();
        Ok(json!(format!("Reloaded {} tools", count)))
    }
}
