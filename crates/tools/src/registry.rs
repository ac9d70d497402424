use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use axon_core::ToolSyncEntry;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::ai::AiToolProvider;
use crate::engine::EngineToolProvider;
use crate::fs::FsToolProvider;
use crate::session::SessionToolProvider;
use crate::system::SystemToolProvider;
use crate::web::WebToolProvider;
use crate::{RegistryOps, Tool, ToolProvider};

/// One registered capability: identity, docs, coerced input schema, and
/// the handler behind it.
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub handler: Arc<dyn Tool>,
}

/// Immutable view of the registry. In-flight dispatches hold a snapshot,
/// so a concurrent reload never shows them a half-swapped namespace.
#[derive(Default)]
pub struct RegistrySnapshot {
    tools: HashMap<String, Arc<ToolDefinition>>,
}

impl RegistrySnapshot {
    pub fn resolve(&self, name: &str) -> Option<&Arc<ToolDefinition>> {
        self.tools.get(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Entries for the relay tool-sync push.
    pub fn sync_entries(&self) -> BTreeMap<String, ToolSyncEntry> {
        self.tools
            .iter()
            .map(|(name, def)| {
                (
                    name.clone(),
                    ToolSyncEntry {
                        description: def.description.clone(),
                        input_schema: def.input_schema.clone(),
                    },
                )
            })
            .collect()
    }

    /// Entries for the JSON-RPC tools/list response.
    pub fn list_entries(&self) -> Vec<Value> {
        let mut entries: Vec<Value> = self
            .tools
            .values()
            .map(|def| {
                json!({
                    "name": def.name,
                    "description": def.description,
                    "inputSchema": def.input_schema,
                })
            })
            .collect();
        entries.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));
        entries
    }
}

/// Provider-driven tool registry with an atomically swappable snapshot.
pub struct ToolRegistry {
    providers: Vec<Arc<dyn ToolProvider>>,
    snapshot: RwLock<Arc<RegistrySnapshot>>,
}

impl ToolRegistry {
    pub fn load(providers: Vec<Arc<dyn ToolProvider>>) -> Self {
        let snapshot = Arc::new(build_snapshot(&providers));
        Self {
            providers,
            snapshot: RwLock::new(snapshot),
        }
    }

    pub fn with_defaults() -> Self {
        Self::load(default_providers())
    }

    /// Current consistent view. Cheap to clone; hold it for the duration
    /// of one dispatch.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot.read().unwrap().clone()
    }

    /// Re-run discovery across all providers and swap the snapshot in one
    /// step. Returns the new tool count.
    pub fn reload(&self) -> usize {
        let fresh = Arc::new(build_snapshot(&self.providers));
        let count = fresh.len();
        *self.snapshot.write().unwrap() = fresh;
        debug!(count, "Tool registry reloaded");
        count
    }
}

impl RegistryOps for ToolRegistry {
    fn reload(&self) -> usize {
        ToolRegistry::reload(self)
    }

    fn tool_names(&self) -> Vec<String> {
        self.snapshot().tool_names()
    }
}

pub fn default_providers() -> Vec<Arc<dyn ToolProvider>> {
    vec![
        Arc::new(FsToolProvider),
        Arc::new(SystemToolProvider),
        Arc::new(WebToolProvider),
        Arc::new(AiToolProvider),
        Arc::new(EngineToolProvider),
        Arc::new(SessionToolProvider),
    ]
}

fn build_snapshot(providers: &[Arc<dyn ToolProvider>]) -> RegistrySnapshot {
    let mut tools: HashMap<String, Arc<ToolDefinition>> = HashMap::new();
    for provider in providers {
        for tool in provider.tools() {
            let schema = tool.schema();
            if tools.contains_key(schema.name) {
                // First-loaded definition wins; a collision is reported,
                // never fatal.
                warn!(
                    name = schema.name,
                    provider = provider.name(),
                    "Duplicate tool name, keeping first definition"
                );
                continue;
            }
            let input_schema = coerce_schema(schema.name, schema.parameters);
            debug!(name = schema.name, provider = provider.name(), "Registering tool");
            tools.insert(
                schema.name.to_string(),
                Arc::new(ToolDefinition {
                    name: schema.name.to_string(),
                    description: schema.description.to_string(),
                    input_schema,
                    handler: tool,
                }),
            );
        }
    }
    RegistrySnapshot { tools }
}

/// A malformed schema descriptor must not blank out the rest of the
/// namespace: coerce it to an empty object schema instead of rejecting.
fn coerce_schema(name: &str, parameters: Value) -> Value {
    if parameters.is_object() {
        parameters
    } else {
        warn!(name, "Tool declared a non-object input schema, coercing to empty object");
        json!({"type": "object", "properties": {}})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ToolContext, ToolSchema};
    use async_trait::async_trait;
    use axon_core::Result;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NamedTool {
        name: &'static str,
        description: &'static str,
        parameters: Value,
    }

    #[async_trait]
    impl Tool for NamedTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: self.name,
                description: self.description,
                parameters: self.parameters.clone(),
            }
        }

        fn validate(&self, _params: &Value) -> Result<()> {
            Ok(())
        }

        async fn execute(&self, _ctx: ToolContext, _params: Value) -> Result<Value> {
            Ok(json!(self.description))
        }
    }

    struct StaticProvider {
        name: &'static str,
        tools: Vec<Arc<dyn Tool>>,
    }

    impl ToolProvider for StaticProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn tools(&self) -> Vec<Arc<dyn Tool>> {
            self.tools.clone()
        }
    }

    fn named(name: &'static str, description: &'static str) -> Arc<dyn Tool> {
        Arc::new(NamedTool {
            name,
            description,
            parameters: json!({"type": "object", "properties": {}}),
        })
    }

    #[test]
    fn test_collision_keeps_first_definition() {
        let registry = ToolRegistry::load(vec![
            Arc::new(StaticProvider {
                name: "first",
                tools: vec![named("dup.tool", "from first")],
            }),
            Arc::new(StaticProvider {
                name: "second",
                tools: vec![named("dup.tool", "from second"), named("other.tool", "ok")],
            }),
        ]);
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(
            snapshot.resolve("dup.tool").unwrap().description,
            "from first"
        );
        assert!(snapshot.resolve("other.tool").is_some());
    }

    #[test]
    fn test_malformed_schema_coerced_to_empty_object() {
        let registry = ToolRegistry::load(vec![Arc::new(StaticProvider {
            name: "bad",
            tools: vec![Arc::new(NamedTool {
                name: "bad.schema",
                description: "schema is a string",
                parameters: json!("not a schema"),
            })],
        })]);
        let snapshot = registry.snapshot();
        let def = snapshot.resolve("bad.schema").unwrap();
        assert_eq!(def.input_schema, json!({"type": "object", "properties": {}}));
    }

    #[test]
    fn test_resolve_unknown_is_none() {
        let registry = ToolRegistry::load(vec![]);
        assert!(registry.snapshot().resolve("nope").is_none());
    }

    #[test]
    fn test_reload_swaps_snapshot_atomically() {
        static GENERATION: AtomicUsize = AtomicUsize::new(0);

        struct GenerationProvider;

        impl ToolProvider for GenerationProvider {
            fn name(&self) -> &str {
                "generation"
            }

            fn tools(&self) -> Vec<Arc<dyn Tool>> {
                if GENERATION.load(Ordering::SeqCst) == 0 {
                    vec![named("gen.alpha", "v0")]
                } else {
                    vec![named("gen.alpha", "v1"), named("gen.beta", "v1")]
                }
            }
        }

        let registry = ToolRegistry::load(vec![Arc::new(GenerationProvider)]);
        let old = registry.snapshot();
        assert_eq!(old.len(), 1);

        GENERATION.store(1, Ordering::SeqCst);
        assert_eq!(registry.reload(), 2);

        // The held snapshot still sees the old consistent view.
        assert_eq!(old.len(), 1);
        assert_eq!(old.resolve("gen.alpha").unwrap().description, "v0");
        let fresh = registry.snapshot();
        assert_eq!(fresh.resolve("gen.alpha").unwrap().description, "v1");
        assert!(fresh.resolve("gen.beta").is_some());
    }

    #[test]
    fn test_default_providers_register_builtins() {
        let registry = ToolRegistry::with_defaults();
        let names = registry.snapshot().tool_names();
        assert!(names.contains(&"fs.read_file".to_string()));
        assert!(names.contains(&"fs.write_file".to_string()));
        assert!(names.contains(&"system.run_command".to_string()));
        assert!(names.contains(&"web.search".to_string()));
        assert!(names.contains(&"ai.prompt".to_string()));
        assert!(names.contains(&"engine.call".to_string()));
        assert!(names.contains(&"system.resurrect".to_string()));
    }

    #[test]
    fn test_sync_entries_shape() {
        let registry = ToolRegistry::with_defaults();
        let entries = registry.snapshot().sync_entries();
        let read_file = entries.get("fs.read_file").unwrap();
        assert!(!read_file.description.is_empty());
        assert_eq!(read_file.input_schema["type"], json!("object"));
    }
}
