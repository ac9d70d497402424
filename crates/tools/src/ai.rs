use async_trait::async_trait;
use axon_core::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::{Tool, ToolContext, ToolProvider, ToolSchema};

pub struct AiToolProvider;

impl ToolProvider for AiToolProvider {
    fn name(&self) -> &str {
        "ai"
    }

    fn tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![Arc::new(PromptTool)]
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// One-shot prompt against a local Ollama-style inference endpoint.
pub struct PromptTool;

#[async_trait]
impl Tool for PromptTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "ai.prompt",
            description: "Send a prompt to the local language model",
            parameters: json!({
                "type": "object",
                "properties": {
                    "prompt": {
                        "type": "string",
                        "description": "The prompt to send"
                    },
                    "system": {
                        "type": "string",
                        "description": "System instruction (optional)"
                    },
                    "model": {
                        "type": "string",
                        "description": "Model name override (optional)"
                    }
                },
                "required": ["prompt"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        if params.get("prompt").and_then(|v| v.as_str()).is_none() {
            return Err(Error::Validation("Missing required parameter: prompt".to_string()));
        }
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let prompt = params
            .get("prompt")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Validation("Missing required parameter: prompt".to_string()))?;
        let system = params.get("system").and_then(|v| v.as_str());
        let model = params
            .get("model")
            .and_then(|v| v.as_str())
            .unwrap_or(&ctx.config.tools.ai.model);

        let api_base = ctx.config.tools.ai.api_base.trim_end_matches('/');
        // Local inference can be slow; use a generous request timeout.
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| Error::Tool(format!("Failed to build HTTP client: {}", e)))?;

        let request = GenerateRequest {
            model,
            prompt,
            system,
            stream: false,
        };

        let resp = client
            .post(format!("{}/api/generate", api_base))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Tool(format!("LLM request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(Error::Tool(format!("LLM endpoint returned {}", resp.status())));
        }

        let body: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| Error::Tool(format!("LLM response parse failed: {}", e)))?;

        Ok(json!(body.response))
    }
}
