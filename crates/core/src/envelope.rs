use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Reserved correlation id that turns a request into a tool-sync trigger.
pub const SYNC_TOOLS_ID: &str = "__sync_tools__";

/// Envelope-kind discriminator with the same effect as [`SYNC_TOOLS_ID`].
pub const SYNC_REQUEST_KIND: &str = "sync_request";

/// One request from the remote controller. The id is opaque and
/// caller-chosen (string or number); it is echoed back verbatim.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestEnvelope {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl RequestEnvelope {
    pub fn is_sync(&self) -> bool {
        matches!(self.id.as_ref().and_then(|v| v.as_str()), Some(SYNC_TOOLS_ID))
            || self.kind.as_deref() == Some(SYNC_REQUEST_KIND)
    }
}

/// Exactly one of these is produced per consumed request, carrying either
/// a result value or an error message. Never retried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseEnvelope {
    pub fn ok(id: Value, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: Value, error: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSyncEntry {
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Pushed on every (re)connect and in answer to sync requests so the
/// remote side's picture of available tools stays current.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSyncEnvelope {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub tools: BTreeMap<String, ToolSyncEntry>,
}

impl ToolSyncEnvelope {
    pub fn new(tools: BTreeMap<String, ToolSyncEntry>) -> Self {
        Self {
            id: SYNC_TOOLS_ID.to_string(),
            kind: "sync_response".to_string(),
            tools,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_envelope_parses_invocation() {
        let raw = r#"{"id":"1","tool":"fs.read_file","args":{"path":"/tmp/x"}}"#;
        let env: RequestEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(env.id, Some(json!("1")));
        assert_eq!(env.tool.as_deref(), Some("fs.read_file"));
        assert_eq!(env.args["path"], json!("/tmp/x"));
        assert!(!env.is_sync());
    }

    #[test]
    fn test_request_envelope_numeric_id() {
        let env: RequestEnvelope =
            serde_json::from_str(r#"{"id":42,"tool":"t","args":{}}"#).unwrap();
        assert_eq!(env.id, Some(json!(42)));
    }

    #[test]
    fn test_sync_by_reserved_id() {
        let env: RequestEnvelope =
            serde_json::from_str(r#"{"id":"__sync_tools__"}"#).unwrap();
        assert!(env.is_sync());
    }

    #[test]
    fn test_sync_by_kind() {
        let env: RequestEnvelope =
            serde_json::from_str(r#"{"type":"sync_request"}"#).unwrap();
        assert!(env.is_sync());
    }

    #[test]
    fn test_response_envelope_serializes_one_arm() {
        let ok = ResponseEnvelope::ok(json!("1"), json!("hello"));
        let raw = serde_json::to_value(&ok).unwrap();
        assert_eq!(raw, json!({"id": "1", "result": "hello"}));

        let err = ResponseEnvelope::err(json!(2), "Unknown tool: nope");
        let raw = serde_json::to_value(&err).unwrap();
        assert_eq!(raw, json!({"id": 2, "error": "Unknown tool: nope"}));
    }

    #[test]
    fn test_tool_sync_envelope_wire_shape() {
        let mut tools = BTreeMap::new();
        tools.insert(
            "fs.read_file".to_string(),
            ToolSyncEntry {
                description: "Read a file".to_string(),
                input_schema: json!({"type": "object", "properties": {}}),
            },
        );
        let env = ToolSyncEnvelope::new(tools);
        let raw = serde_json::to_value(&env).unwrap();
        assert_eq!(raw["id"], json!(SYNC_TOOLS_ID));
        assert_eq!(raw["type"], json!("sync_response"));
        assert!(raw["tools"]["fs.read_file"]["inputSchema"].is_object());
    }
}
