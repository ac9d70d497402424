use axon_tools::ToolRegistry;

pub async fn list() -> anyhow::Result<()> {
    let registry = ToolRegistry::with_defaults();
    let snapshot = registry.snapshot();

    println!("Registered tools ({}):", snapshot.len());
    for name in snapshot.tool_names() {
        if let Some(def) = snapshot.resolve(&name) {
            // First sentence of the description keeps the listing compact.
            let brief = def
                .description
                .split_once(". ")
                .map(|(first, _)| format!("{}.", first))
                .unwrap_or_else(|| def.description.clone());
            println!("  {:24} {}", def.name, brief);
        }
    }
    Ok(())
}
