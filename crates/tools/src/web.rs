use async_trait::async_trait;
use axon_core::{Error, Result};
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{Tool, ToolContext, ToolProvider, ToolSchema};

pub struct WebToolProvider;

impl ToolProvider for WebToolProvider {
    fn name(&self) -> &str {
        "web"
    }

    fn tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![Arc::new(WebSearchTool)]
    }
}

pub struct WebSearchTool;

#[async_trait]
impl Tool for WebSearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "web.search",
            description: "Search the web for current information. Returns title, link and summary per result.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search keywords"
                    },
                    "max_results": {
                        "type": "integer",
                        "description": "Number of results (1-10, default 3)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        if params.get("query").and_then(|v| v.as_str()).is_none() {
            return Err(Error::Validation("Missing required parameter: query".to_string()));
        }
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let query = params
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Validation("Missing required parameter: query".to_string()))?;
        let count = params
            .get("max_results")
            .and_then(|v| v.as_u64())
            .unwrap_or(3)
            .clamp(1, 10) as usize;

        let api_key = &ctx.config.tools.web.api_key;
        if api_key.is_empty() {
            return Ok(json!("Error: Search API key not configured"));
        }

        match brave_search(api_key, query, count).await {
            Ok(results) if results.is_empty() => {
                Ok(json!("[No results] Try different keywords."))
            }
            Ok(results) => Ok(json!(results.join("\n"))),
            Err(e) => {
                tracing::warn!(error = %e, "Web search failed");
                Ok(json!(format!("Error: Search failed: {}", e)))
            }
        }
    }
}

async fn brave_search(api_key: &str, query: &str, count: usize) -> Result<Vec<String>> {
    let client = Client::new();
    let resp = client
        .get("https://api.search.brave.com/res/v1/web/search")
        .header("X-Subscription-Token", api_key)
        .query(&[("q", query), ("count", &count.to_string())])
        .send()
        .await
        .map_err(|e| Error::Tool(format!("Search request failed: {}", e)))?;

    if !resp.status().is_success() {
        return Err(Error::Tool(format!("Search API returned {}", resp.status())));
    }

    let body: Value = resp
        .json()
        .await
        .map_err(|e| Error::Tool(format!("Search response parse failed: {}", e)))?;

    let results = body["web"]["results"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .take(count)
                .map(|item| {
                    let title = item["title"].as_str().unwrap_or("No Title");
                    let link = item["url"].as_str().unwrap_or("No Link");
                    let summary = item["description"].as_str().unwrap_or("No Content");
                    format!("Title: {}\nLink: {}\nSummary: {}\n---", title, link, summary)
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema() {
        assert_eq!(WebSearchTool.schema().name, "web.search");
    }

    #[test]
    fn test_validate() {
        assert!(WebSearchTool.validate(&json!({"query": "rust"})).is_ok());
        assert!(WebSearchTool.validate(&json!({})).is_err());
    }

    #[tokio::test]
    async fn test_missing_api_key_is_soft_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::bare(dir.path().to_path_buf());
        let result = WebSearchTool
            .execute(ctx, json!({"query": "anything"}))
            .await
            .unwrap();
        assert_eq!(result, json!("Error: Search API key not configured"));
    }
}
