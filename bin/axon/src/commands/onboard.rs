use axon_core::{Config, Paths};

pub async fn run(force: bool) -> anyhow::Result<()> {
    let paths = Paths::new();
    let config_path = paths.config_file();

    if config_path.exists() && !force {
        println!("Config already exists: {}", config_path.display());
        println!("Use --force to overwrite.");
        return Ok(());
    }

    std::fs::create_dir_all(&paths.base)?;
    std::fs::create_dir_all(paths.workspace())?;
    std::fs::create_dir_all(paths.state_dir())?;
    std::fs::create_dir_all(paths.engine_dir())?;

    let config = Config::default();
    config.save(&config_path)?;

    println!("axon initialized.");
    println!("  Config:    {}", config_path.display());
    println!("  Workspace: {}", paths.workspace().display());
    println!("  Relay URL: {}", config.relay.url);
    println!();
    println!("Edit the config to point at your relay, then run: axon gateway");
    Ok(())
}
