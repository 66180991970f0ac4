//! Coordinator configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use arena_types::CoordinatorParams;

use crate::CoordinatorError;

/// Configuration for the ARENA coordinator daemon.
///
/// Can be loaded from a TOML file via [`CoordinatorConfig::from_toml_file`]
/// or built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Data directory for challenge storage.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Lifecycle parameters (fees, windows, deadlines).
    #[serde(default)]
    pub params: CoordinatorParams,

    /// Whether to enable the RPC server.
    #[serde(default = "default_true")]
    pub enable_rpc: bool,

    /// RPC port (if enabled).
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// Whether to enable the WebSocket server.
    #[serde(default = "default_true")]
    pub enable_websocket: bool,

    /// WebSocket port (if enabled).
    #[serde(default = "default_ws_port")]
    pub websocket_port: u16,

    /// LMDB map size in bytes.
    #[serde(default = "default_map_size")]
    pub map_size: usize,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./arena_data")
}

fn default_true() -> bool {
    true
}

fn default_rpc_port() -> u16 {
    9087
}

fn default_ws_port() -> u16 {
    9088
}

fn default_map_size() -> usize {
    1024 * 1024 * 1024
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl CoordinatorConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, CoordinatorError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| CoordinatorError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, CoordinatorError> {
        toml::from_str(s).map_err(|e| CoordinatorError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, CoordinatorError> {
        toml::to_string_pretty(self).map_err(|e| CoordinatorError::Config(e.to_string()))
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            params: CoordinatorParams::defaults(),
            enable_rpc: true,
            rpc_port: default_rpc_port(),
            enable_websocket: true,
            websocket_port: default_ws_port(),
            map_size: default_map_size(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}
