use async_trait::async_trait;
use axon_core::{Error, Result};
use regex::Regex;
use serde_json::{json, Value};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::{safe_truncate, Tool, ToolContext, ToolProvider, ToolSchema};

pub struct SystemToolProvider;

impl ToolProvider for SystemToolProvider {
    fn name(&self) -> &str {
        "system"
    }

    fn tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![Arc::new(RunCommandTool)]
    }
}

const DENY_PATTERNS: &[&str] = &[
    r"rm\s+-rf\s+/",
    r"rm\s+-rf\s+~",
    r"rm\s+-rf\s+\*",
    r"\bdd\b.*\bif=",
    r"\bshutdown\b",
    r"\breboot\b",
    r":\(\)\s*\{\s*:\|:\s*&\s*\}\s*;", // fork bomb
    r">\s*/dev/sd",
    r"mkfs\.",
];

fn is_dangerous_command(command: &str) -> bool {
    for pattern in DENY_PATTERNS {
        if let Ok(re) = Regex::new(pattern) {
            if re.is_match(command) {
                return true;
            }
        }
    }
    false
}

const MAX_OUTPUT_CHARS: usize = 10000;

pub struct RunCommandTool;

#[async_trait]
impl Tool for RunCommandTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "system.run_command",
            description: "Run a shell command",
            parameters: json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "Command to run"
                    },
                    "cwd": {
                        "type": "string",
                        "description": "Current working directory"
                    }
                },
                "required": ["command"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        let command = params
            .get("command")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Validation("Missing required parameter: command".to_string()))?;

        if is_dangerous_command(command) {
            return Err(Error::Validation(
                "Command matches dangerous pattern and is blocked".to_string(),
            ));
        }

        Ok(())
    }

    fn blocking(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let command = params
            .get("command")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Validation("Missing required parameter: command".to_string()))?;
        let working_dir = params
            .get("cwd")
            .and_then(|v| v.as_str())
            .map(|s| {
                if s.starts_with("~/") {
                    dirs::home_dir()
                        .map(|h| h.join(&s[2..]))
                        .unwrap_or_else(|| std::path::PathBuf::from(s))
                } else if s.starts_with('/') {
                    std::path::PathBuf::from(s)
                } else {
                    ctx.workspace.join(s)
                }
            })
            .unwrap_or_else(|| ctx.workspace.clone());

        let timeout_secs = ctx.config.tools.exec.timeout_secs;

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(&working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let result = timeout(Duration::from_secs(timeout_secs), cmd.output()).await;

        match result {
            Ok(Ok(output)) => {
                let mut stdout = String::from_utf8_lossy(&output.stdout).to_string();
                let mut stderr = String::from_utf8_lossy(&output.stderr).to_string();

                if stdout.len() > MAX_OUTPUT_CHARS {
                    stdout = format!(
                        "{}\n... (output truncated)",
                        safe_truncate(&stdout, MAX_OUTPUT_CHARS)
                    );
                }
                if stderr.len() > MAX_OUTPUT_CHARS {
                    stderr = format!(
                        "{}\n... (output truncated)",
                        safe_truncate(&stderr, MAX_OUTPUT_CHARS)
                    );
                }

                Ok(json!(format!("STDOUT:\n{}\nSTDERR:\n{}", stdout, stderr)))
            }
            Ok(Err(e)) => Ok(json!(format!("Error running command: {}", e))),
            Err(_) => Err(Error::Timeout(format!(
                "Command timed out after {} seconds",
                timeout_secs
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema() {
        let schema = RunCommandTool.schema();
        assert_eq!(schema.name, "system.run_command");
    }

    #[test]
    fn test_marked_blocking() {
        assert!(RunCommandTool.blocking());
    }

    #[test]
    fn test_validate_ok() {
        assert!(RunCommandTool.validate(&json!({"command": "ls -la"})).is_ok());
    }

    #[test]
    fn test_validate_missing_command() {
        assert!(RunCommandTool.validate(&json!({})).is_err());
    }

    #[test]
    fn test_validate_deny_rm_rf() {
        assert!(RunCommandTool.validate(&json!({"command": "rm -rf /"})).is_err());
    }

    #[test]
    fn test_validate_deny_mkfs() {
        assert!(RunCommandTool
            .validate(&json!({"command": "mkfs.ext4 /dev/sda"}))
            .is_err());
    }

    #[tokio::test]
    async fn test_run_command_captures_both_streams() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::bare(dir.path().to_path_buf());
        let result = RunCommandTool
            .execute(ctx, json!({"command": "echo out; echo err >&2"}))
            .await
            .unwrap();
        let text = result.as_str().unwrap();
        assert!(text.contains("STDOUT:\nout"));
        assert!(text.contains("STDERR:\nerr"));
    }

    #[tokio::test]
    async fn test_run_command_respects_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::bare(dir.path().to_path_buf());
        let result = RunCommandTool
            .execute(ctx, json!({"command": "pwd"}))
            .await
            .unwrap();
        let text = result.as_str().unwrap();
        assert!(text.contains(dir.path().file_name().unwrap().to_str().unwrap()));
    }
}
