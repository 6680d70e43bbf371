//! Reconciliation layout and server settings.
//!
//! The sheet layout is read from a JSON file (built-in defaults when the file
//! is absent). Server settings come from the environment, `.env` included.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::info;

const DEFAULT_CONFIG_PATH: &str = "configs/inventario.json";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_MAX_UPLOAD_MB: usize = 25;

/// Where the extractor looks for its columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// 1-indexed sheet row holding the headers. Rows above it are ignored.
    #[serde(default = "default_header_row")]
    pub header_row: usize,
    #[serde(default = "default_serial_column")]
    pub serial_column: String,
    #[serde(default = "default_status_column")]
    pub status_column: String,
    /// Optional column; filtering by name is skipped when the sheet lacks it.
    #[serde(default = "default_name_column")]
    pub name_column: String,
    #[serde(default = "default_name_prefixes")]
    pub name_prefixes: Vec<String>,
}

fn default_header_row() -> usize {
    3
}

fn default_serial_column() -> String {
    "Número de serie".to_string()
}

fn default_status_column() -> String {
    "Estado".to_string()
}

fn default_name_column() -> String {
    "nombre".to_string()
}

fn default_name_prefixes() -> Vec<String> {
    vec!["01-".to_string(), "02-".to_string()]
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            header_row: default_header_row(),
            serial_column: default_serial_column(),
            status_column: default_status_column(),
            name_column: default_name_column(),
            name_prefixes: default_name_prefixes(),
        }
    }
}

impl ReconcileConfig {
    /// Load a config file. Missing fields take their defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let config: ReconcileConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {:?}", path))?;

        if config.header_row == 0 {
            anyhow::bail!("header_row is 1-indexed, got 0 in {:?}", path);
        }

        info!("Loaded reconcile config from {:?}", path);
        Ok(config)
    }

    /// Load from `path` when it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            info!("No config at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }
}

/// Process-level settings for the HTTP service.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub max_upload_bytes: usize,
    pub reconcile_config_path: PathBuf,
}

impl ServerConfig {
    /// Read `BIND_ADDR`, `MAX_UPLOAD_MB` and `RECONCILE_CONFIG`.
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("BIND_ADDR is not a valid socket address")?;

        let max_upload_mb = match std::env::var("MAX_UPLOAD_MB") {
            Ok(v) => v
                .parse::<usize>()
                .with_context(|| format!("MAX_UPLOAD_MB is not a number: {}", v))?,
            Err(_) => DEFAULT_MAX_UPLOAD_MB,
        };

        let reconcile_config_path = std::env::var("RECONCILE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        Ok(Self {
            bind_addr,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            reconcile_config_path,
        })
    }
}
