pub mod ai;
pub mod engine;
pub mod fs;
pub mod registry;
pub mod session;
pub mod system;
pub mod web;

use async_trait::async_trait;
use axon_core::{Config, FaultHub, Result};
use axon_engine::EngineBridge;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

pub use registry::{RegistrySnapshot, ToolDefinition, ToolRegistry};

/// Truncate a string to at most `max_chars` bytes, respecting UTF-8 char
/// boundaries. Returns a borrowed slice of the prefix.
pub fn safe_truncate(s: &str, max_chars: usize) -> &str {
    if s.len() <= max_chars {
        return s;
    }
    // Find the last valid char boundary at or before max_chars bytes
    let mut end = max_chars;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Opaque handle to the registry, passed through ToolContext so
/// administrative tools can trigger a reload without a circular reference.
pub trait RegistryOps: Send + Sync {
    /// Rebuild the snapshot from all providers. Returns the tool count.
    fn reload(&self) -> usize;
    fn tool_names(&self) -> Vec<String>;
}

pub type RegistryHandle = Arc<dyn RegistryOps>;

#[derive(Clone)]
pub struct ToolContext {
    pub workspace: PathBuf,
    pub config: Config,
    pub faults: Arc<FaultHub>,
    pub engine: Option<Arc<EngineBridge>>,
    pub registry: Option<RegistryHandle>,
}

impl ToolContext {
    /// Minimal context for tests and direct CLI invocation.
    pub fn bare(workspace: PathBuf) -> Self {
        Self {
            workspace,
            config: Config::default(),
            faults: Arc::new(FaultHub::new()),
            engine: None,
            registry: None,
        }
    }
}

pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn schema(&self) -> ToolSchema;
    fn validate(&self, params: &Value) -> Result<()>;
    /// Whether execute does long or blocking work and must run on the
    /// bounded worker pool instead of inline on the dispatch task.
    fn blocking(&self) -> bool {
        false
    }
    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value>;
}

/// Registration interface for capability sources. Each source describes
/// the tools it contributes; the registry merges them into one namespace.
pub trait ToolProvider: Send + Sync {
    fn name(&self) -> &str;
    fn tools(&self) -> Vec<Arc<dyn Tool>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_truncate_ascii() {
        assert_eq!(safe_truncate("hello", 3), "hel");
        assert_eq!(safe_truncate("hello", 10), "hello");
    }

    #[test]
    fn test_safe_truncate_multibyte_boundary() {
        let s = "héllo";
        // 'é' is 2 bytes starting at index 1; cutting at 2 must back up.
        assert_eq!(safe_truncate(s, 2), "h");
    }
}
