use axon_core::Error;
use serde_json::{json, Value};
use tracing::debug;

use crate::dispatcher::Dispatcher;

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2025-02-01";
pub const SERVER_NAME: &str = "axon";

pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

fn result_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "result": result,
        "id": id,
    })
}

fn error_response(id: Value, code: i64, message: impl Into<String>) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "error": {"code": code, "message": message.into()},
        "id": id,
    })
}

/// Tool results cross this surface as text content blocks; strings pass
/// through, everything else is serialized.
fn render_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Dispatcher {
    /// JSON-RPC 2.0 surface for the alternate local transport. Same
    /// registry, same invocation path (fatigue included) as the relay.
    pub async fn handle_jsonrpc(&self, body: Value) -> Value {
        let id = body.get("id").cloned().unwrap_or(Value::Null);

        if body.get("jsonrpc").and_then(|v| v.as_str()) != Some(JSONRPC_VERSION) {
            return error_response(id, INVALID_REQUEST, "Invalid JSON-RPC version");
        }

        let method = body.get("method").and_then(|v| v.as_str()).unwrap_or("");
        debug!(method, "JSON-RPC request");

        match method {
            "initialize" => {
                let names = self.registry().snapshot().tool_names();
                let tools: Value = names
                    .iter()
                    .map(|name| (name.clone(), json!({"name": name})))
                    .collect::<serde_json::Map<String, Value>>()
                    .into();
                result_response(
                    id,
                    json!({
                        "protocolVersion": PROTOCOL_VERSION,
                        "capabilities": {"tools": tools},
                        "serverInfo": {
                            "name": SERVER_NAME,
                            "version": env!("CARGO_PKG_VERSION"),
                        },
                    }),
                )
            }

            "tools/list" => {
                let tools = self.registry().snapshot().list_entries();
                result_response(id, json!({"tools": tools}))
            }

            "tools/call" => {
                let params = body.get("params").cloned().unwrap_or_else(|| json!({}));
                let name = match params.get("name").and_then(|v| v.as_str()) {
                    Some(name) => name.to_string(),
                    None => return error_response(id, INVALID_PARAMS, "Missing tool name"),
                };
                let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

                match self.invoke(&name, arguments).await {
                    Ok(result) => result_response(
                        id,
                        json!({
                            "content": [{"type": "text", "text": render_text(&result)}]
                        }),
                    ),
                    Err(Error::NotFound(_)) => {
                        error_response(id, METHOD_NOT_FOUND, "Tool not found")
                    }
                    Err(Error::Validation(msg)) => error_response(id, INVALID_PARAMS, msg),
                    Err(e) => error_response(id, INTERNAL_ERROR, e.to_string()),
                }
            }

            other => error_response(id, METHOD_NOT_FOUND, format!("Unknown method {}", other)),
        }
    }
}
