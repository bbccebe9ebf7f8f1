//! Application configuration.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use soup_link::LinkConfig;
use soup_web::WebConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// KISS TNC connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KissConfig {
    pub host: String,
    pub port: u16,
    /// Fixed delay between reconnect attempts, in seconds.
    pub reconnect_delay_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for KissConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8001,
            reconnect_delay_secs: 5,
            connect_timeout_secs: 10,
        }
    }
}

impl KissConfig {
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig {
            host: self.host.clone(),
            port: self.port,
            reconnect_delay: Duration::from_secs(self.reconnect_delay_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }
}

/// Journal storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub data_dir: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Station callsign used as the source of outbound frames.
    pub mycall: String,
    /// Digipeater path for outbound frames.
    pub digi_path: String,
    /// Whether message events are published to live subscribers in
    /// addition to being journaled.
    pub publish_messages: bool,
    pub kiss: KissConfig,
    pub persistence: PersistenceConfig,
    pub web: WebConfig,
}

impl AppConfig {
    /// Load configuration: explicit path > `SOUP_CONFIG` env var >
    /// `config/default.toml`. A missing file falls back to defaults.
    pub fn load(path: Option<String>) -> AppResult<Self> {
        let config_path = path
            .or_else(|| std::env::var("SOUP_CONFIG").ok())
            .unwrap_or_else(|| "config/default.toml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            Self::from_file(&config_path)?
        } else {
            warn!(path = %config_path, "Config file not found, using defaults");
            Self::default()
        };

        config.apply_overrides(
            std::env::var("KISS_HOST").ok(),
            std::env::var("KISS_PORT").ok(),
            std::env::var("MYCALL").ok(),
        )?;
        Ok(config)
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    fn apply_overrides(
        &mut self,
        kiss_host: Option<String>,
        kiss_port: Option<String>,
        mycall: Option<String>,
    ) -> AppResult<()> {
        if let Some(host) = kiss_host {
            self.kiss.host = host;
        }
        if let Some(port) = kiss_port {
            self.kiss.port = port
                .parse()
                .map_err(|_| AppError::Config(format!("Invalid KISS_PORT: {port}")))?;
        }
        if let Some(call) = mycall {
            self.mycall = call;
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mycall: "N0CALL".to_string(),
            digi_path: "WIDE2-2".to_string(),
            publish_messages: false,
            kiss: KissConfig::default(),
            persistence: PersistenceConfig::default(),
            web: WebConfig::default(),
        }
    }
}
