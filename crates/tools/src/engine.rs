use async_trait::async_trait;
use axon_core::{Error, Result};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::{Tool, ToolContext, ToolProvider, ToolSchema};

pub struct EngineToolProvider;

impl ToolProvider for EngineToolProvider {
    fn name(&self) -> &str {
        "engine"
    }

    fn tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![Arc::new(EngineCallTool), Arc::new(EngineWaitErrorTool)]
    }
}

// ============ engine.call ============

/// Forward a method call to the external engine over its command socket.
pub struct EngineCallTool;

#[async_trait]
impl Tool for EngineCallTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "engine.call",
            description: "Send a JSON method call to the external engine and return its response",
            parameters: json!({
                "type": "object",
                "properties": {
                    "method": {
                        "type": "string",
                        "description": "Method name (e.g. CreateScript)"
                    },
                    "params": {
                        "type": "object",
                        "description": "Parameters for the method"
                    },
                    "timeout_secs": {
                        "type": "integer",
                        "description": "Response deadline override in seconds"
                    }
                },
                "required": ["method"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        if params.get("method").and_then(|v| v.as_str()).is_none() {
            return Err(Error::Validation("Missing required parameter: method".to_string()));
        }
        Ok(())
    }

    fn blocking(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let method = params
            .get("method")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Validation("Missing required parameter: method".to_string()))?;
        let method_params = params.get("params").cloned().unwrap_or_else(|| json!({}));

        let bridge = ctx
            .engine
            .as_ref()
            .ok_or_else(|| Error::Tool("Engine bridge not configured".to_string()))?;

        let message = json!({
            "method": method,
            "params": method_params,
            "timestamp": chrono::Utc::now().timestamp_millis(),
        });

        match params.get("timeout_secs").and_then(|v| v.as_u64()) {
            Some(secs) => {
                bridge
                    .call_with_timeout(&message, Duration::from_secs(secs.max(1)))
                    .await
            }
            None => bridge.call(&message).await,
        }
    }
}

// ============ engine.wait_error ============

/// Block until the next fault shows up on the shared fault hub. Used by the
/// controller to watch for engine-side failures (compile errors and the
/// like) out of band of the request/response flow.
pub struct EngineWaitErrorTool;

#[async_trait]
impl Tool for EngineWaitErrorTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "engine.wait_error",
            description: "Wait for the next reported fault (engine or bridge) and return it",
            parameters: json!({
                "type": "object",
                "properties": {
                    "timeout_secs": {
                        "type": "integer",
                        "description": "How long to wait before giving up (default 60)"
                    }
                }
            }),
        }
    }

    fn validate(&self, _params: &Value) -> Result<()> {
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let timeout_secs = params
            .get("timeout_secs")
            .and_then(|v| v.as_u64())
            .unwrap_or(60)
            .max(1);

        match ctx.faults.await_next(Duration::from_secs(timeout_secs)).await {
            Some(fault) => Ok(serde_json::to_value(&fault)?),
            None => Ok(json!(format!("No fault observed within {}s", timeout_secs))),
        }
    }
}
