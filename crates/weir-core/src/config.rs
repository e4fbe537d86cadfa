//! Configuration system for weir.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $WEIR_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/weir/config.toml
//!   3. ~/.config/weir/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::wire::NodeId;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeirConfig {
    pub peers: Vec<PeerConfig>,
    pub node: NodeConfig,
    pub scheduler: SchedulerConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// This server's identity in the cluster.
    pub id: NodeId,
    /// UDP address the server-to-server link binds to.
    pub listen: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Aggregate outbound budget shared by every destination.
    pub rate_bytes_per_sec: u64,
    /// Divide weights by the sum over active destinations only.
    pub renormalize_weights: bool,
    /// Capacity of a queue provisioned through a weight assignment.
    pub default_queue_capacity_bytes: usize,
    /// Interval between scheduling ticks.
    pub tick_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub enabled: bool,
    /// HTTP port on 127.0.0.1.
    pub port: u16,
}

/// A statically known peer server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    pub id: NodeId,
    /// UDP address of the peer's server link.
    pub addr: String,
    #[serde(default = "default_peer_weight")]
    pub weight: f64,
}

fn default_peer_weight() -> f64 {
    1.0
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for WeirConfig {
    fn default() -> Self {
        Self {
            peers: Vec::new(),
            node: NodeConfig::default(),
            scheduler: SchedulerConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            id: NodeId(1),
            listen: "0.0.0.0:7400".to_string(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            rate_bytes_per_sec: 1_048_576, // 1 MiB/s
            renormalize_weights: true,
            default_queue_capacity_bytes: 65536,
            tick_interval_ms: 10,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 7401,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("weir")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl WeirConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            WeirConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse a specific file without consulting the environment.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("WEIR_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&WeirConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply WEIR_* env var overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("WEIR_NODE__ID").and_then(|v| v.parse().ok()) {
            self.node.id = NodeId(v);
        }
        if let Some(v) = lookup("WEIR_NODE__LISTEN") {
            self.node.listen = v;
        }
        if let Some(v) = lookup("WEIR_SCHEDULER__RATE_BYTES_PER_SEC").and_then(|v| v.parse().ok()) {
            self.scheduler.rate_bytes_per_sec = v;
        }
        if let Some(v) = lookup("WEIR_SCHEDULER__RENORMALIZE_WEIGHTS") {
            self.scheduler.renormalize_weights = v == "true" || v == "1";
        }
        if let Some(v) = lookup("WEIR_SCHEDULER__TICK_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            self.scheduler.tick_interval_ms = v;
        }
        if let Some(v) = lookup("WEIR_API__PORT").and_then(|v| v.parse().ok()) {
            self.api.port = v;
        }
    }
}
