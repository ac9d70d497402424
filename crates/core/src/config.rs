use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::paths::Paths;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayConfig {
    #[serde(default = "default_relay_enabled")]
    pub enabled: bool,
    #[serde(default = "default_relay_url")]
    pub url: String,
    /// Fixed delay between reconnect attempts. No exponential growth,
    /// no retry cap.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
    /// Pong deadline. Generous so a probe timeout during a minutes-long
    /// handler run is not mistaken for a dead connection.
    #[serde(default = "default_ping_timeout_secs")]
    pub ping_timeout_secs: u64,
}

fn default_relay_enabled() -> bool {
    true
}

fn default_relay_url() -> String {
    "wss://axon-relay.onrender.com/ws".to_string()
}

fn default_reconnect_delay_secs() -> u64 {
    2
}

fn default_ping_interval_secs() -> u64 {
    10
}

fn default_ping_timeout_secs() -> u64 {
    300
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: default_relay_enabled(),
            url: default_relay_url(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            ping_interval_secs: default_ping_interval_secs(),
            ping_timeout_secs: default_ping_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Duplex request/response socket. A fresh connection is opened per call.
    #[serde(default = "default_command_socket")]
    pub command_socket: String,
    /// One-way log stream socket, followed by the background listener.
    #[serde(default = "default_log_socket")]
    pub log_socket: String,
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    #[serde(default = "default_log_retry_secs")]
    pub log_retry_secs: u64,
}

fn default_command_socket() -> String {
    "~/.axon/engine/command.sock".to_string()
}

fn default_log_socket() -> String {
    "~/.axon/engine/log.sock".to_string()
}

fn default_call_timeout_secs() -> u64 {
    30
}

fn default_log_retry_secs() -> u64 {
    1
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command_socket: default_command_socket(),
            log_socket: default_log_socket(),
            call_timeout_secs: default_call_timeout_secs(),
            log_retry_secs: default_log_retry_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_host")]
    pub host: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8123
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchConfig {
    /// Successful non-administrative invocations before results start
    /// carrying the reset advisory.
    #[serde(default = "default_fatigue_limit")]
    pub fatigue_limit: u32,
    /// Bound on concurrently running offloaded handlers.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

fn default_fatigue_limit() -> u32 {
    30
}

fn default_max_workers() -> usize {
    8
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            fatigue_limit: default_fatigue_limit(),
            max_workers: default_max_workers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ToolsConfig {
    #[serde(default)]
    pub exec: ExecToolConfig,
    #[serde(default)]
    pub web: WebToolConfig,
    #[serde(default)]
    pub ai: AiToolConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecToolConfig {
    #[serde(default = "default_exec_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_exec_timeout_secs() -> u64 {
    60
}

impl Default for ExecToolConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_exec_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WebToolConfig {
    /// Brave Search API key. Searches fail softly when unset.
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiToolConfig {
    #[serde(default = "default_ai_api_base")]
    pub api_base: String,
    #[serde(default = "default_ai_model")]
    pub model: String,
}

fn default_ai_api_base() -> String {
    "http://localhost:11434".to_string()
}

fn default_ai_model() -> String {
    "qwen3-coder:30b".to_string()
}

impl Default for AiToolConfig {
    fn default() -> Self {
        Self {
            api_base: default_ai_api_base(),
            model: default_ai_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub workspace: Option<String>,
    pub relay: RelayConfig,
    pub engine: EngineConfig,
    pub gateway: GatewayConfig,
    pub dispatch: DispatchConfig,
    pub tools: ToolsConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn load_or_default(paths: &Paths) -> Result<Self> {
        let config_path = paths.config_file();
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Workspace directory, defaulting to the standard location under the
    /// base dir when not configured.
    pub fn workspace_dir(&self, paths: &Paths) -> std::path::PathBuf {
        match self.workspace.as_deref() {
            Some(ws) if !ws.trim().is_empty() => Paths::expand_tilde(ws),
            _ => paths.workspace(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert!(cfg.relay.enabled);
        assert_eq!(cfg.relay.reconnect_delay_secs, 2);
        assert_eq!(cfg.relay.ping_timeout_secs, 300);
        assert_eq!(cfg.gateway.port, 8123);
        assert_eq!(cfg.dispatch.fatigue_limit, 30);
        assert_eq!(cfg.engine.call_timeout_secs, 30);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let raw = r#"{
  "relay": { "url": "wss://example.test/ws" },
  "gateway": { "port": 9000 }
}"#;
        let cfg: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.relay.url, "wss://example.test/ws");
        assert_eq!(cfg.relay.reconnect_delay_secs, 2);
        assert_eq!(cfg.gateway.port, 9000);
        assert_eq!(cfg.gateway.host, "127.0.0.1");
        assert_eq!(cfg.dispatch.fatigue_limit, 30);
    }

    #[test]
    fn test_roundtrip() {
        let cfg = Config::default();
        let raw = serde_json::to_string(&cfg).unwrap();
        let parsed: Config = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.relay.url, cfg.relay.url);
        assert_eq!(parsed.engine.command_socket, cfg.engine.command_socket);
    }
}
