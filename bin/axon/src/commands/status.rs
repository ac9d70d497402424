use axon_core::{Config, Paths};
use axon_tools::ToolRegistry;

pub async fn run() -> anyhow::Result<()> {
    let paths = Paths::new();
    let config_path = paths.config_file();
    let config = Config::load_or_default(&paths)?;

    println!("axon status");
    println!(
        "  Config:        {} ({})",
        config_path.display(),
        if config_path.exists() { "present" } else { "defaults" }
    );
    println!("  Workspace:     {}", config.workspace_dir(&paths).display());
    println!(
        "  Relay:         {} ({})",
        config.relay.url,
        if config.relay.enabled { "enabled" } else { "disabled" }
    );
    println!(
        "  Gateway:       http://{}:{}",
        config.gateway.host, config.gateway.port
    );

    let command_socket = Paths::expand_tilde(&config.engine.command_socket);
    println!(
        "  Engine socket: {} ({})",
        command_socket.display(),
        if command_socket.exists() { "present" } else { "absent" }
    );

    let registry = ToolRegistry::with_defaults();
    println!("  Tools:         {}", registry.snapshot().len());
    println!("  Fatigue limit: {}", config.dispatch.fatigue_limit);
    Ok(())
}
