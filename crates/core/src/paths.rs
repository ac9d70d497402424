use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Paths {
    pub base: PathBuf,
}

impl Paths {
    pub fn new() -> Self {
        let base = dirs::home_dir()
            .map(|h| h.join(".axon"))
            .unwrap_or_else(|| PathBuf::from(".axon"));
        Self { base }
    }

    pub fn with_base(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.json")
    }

    pub fn workspace(&self) -> PathBuf {
        self.base.join("workspace")
    }

    /// Saved context snapshots (system.save_context / system.resurrect).
    pub fn state_dir(&self) -> PathBuf {
        self.workspace().join("state")
    }

    pub fn engine_dir(&self) -> PathBuf {
        self.base.join("engine")
    }

    /// Expand a leading `~/` against the home directory.
    pub fn expand_tilde(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            dirs::home_dir()
                .map(|h| h.join(rest))
                .unwrap_or_else(|| PathBuf::from(path))
        } else {
            PathBuf::from(path)
        }
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_layout() {
        let paths = Paths::with_base(PathBuf::from("/tmp/axon-test"));
        assert_eq!(paths.config_file(), PathBuf::from("/tmp/axon-test/config.json"));
        assert_eq!(paths.workspace(), PathBuf::from("/tmp/axon-test/workspace"));
        assert_eq!(paths.state_dir(), PathBuf::from("/tmp/axon-test/workspace/state"));
    }

    #[test]
    fn test_expand_tilde_absolute_passthrough() {
        assert_eq!(Paths::expand_tilde("/var/run/x.sock"), PathBuf::from("/var/run/x.sock"));
    }

    #[test]
    fn test_expand_tilde_home() {
        let expanded = Paths::expand_tilde("~/sock");
        assert!(expanded.to_string_lossy().ends_with("sock"));
        assert!(!expanded.to_string_lossy().starts_with("~"));
    }
}
