//! Service configuration
//!
//! Loaded from a TOML file (default `~/.vitaquest/config.toml`); every field
//! has a default so an empty file - or no file at all - yields a working
//! local setup.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub recommender: RecommenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Worker threads pulling from the HTTP accept queue.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file; defaults to `~/.vitaquest/vitaquest.db`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Version-conflict retries before surfacing the conflict to the caller.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommenderConfig {
    /// External scoring service; unset means stored order.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_recommender_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8640
}

fn default_workers() -> usize {
    4
}

fn default_max_retries() -> u32 {
    3
}

fn default_recommender_timeout_ms() -> u64 {
    500
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            workers: default_workers(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
        }
    }
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: default_recommender_timeout_ms(),
        }
    }
}

impl Config {
    /// Directory for config and data files.
    pub fn global_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".vitaquest")
    }

    pub fn default_config_path() -> PathBuf {
        Self::global_dir().join("config.toml")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Invalid config: {}", path.display()))
    }

    /// Load from an explicit path (error if missing) or from the default
    /// location (defaults if missing).
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = Self::default_config_path();
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Database path, honoring the config override.
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| Self::global_dir().join("vitaquest.db"))
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }

    /// Write a commented starter config.
    pub fn write_default(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            anyhow::bail!("config already exists: {} (use --force)", path.display());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config dir: {}", parent.display()))?;
        }
        std::fs::write(path, DEFAULT_CONFIG_TOML)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }
}

const DEFAULT_CONFIG_TOML: &str = r#"# VitaQuest configuration

[server]
bind = "127.0.0.1"
port = 8640
workers = 4

[database]
# path = "/var/lib/vitaquest/vitaquest.db"

[engine]
max_retries = 3

[recommender]
# External challenge-scoring service (best-effort; stored order if unset)
# url = "http://127.0.0.1:5001/rank"
timeout_ms = 500
"#;
