//! Configuration for the portal REPL and the auth backend.
//!
//! Precedence, lowest first: built-in defaults, `~/.portal/config.toml` (or
//! an explicit path), environment variables, command-line flags.

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Directory holding the JSON blobs (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// HTTP backend settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Account created when no user collection exists yet
    #[serde(default)]
    pub admin: AdminSeed,
}

/// HTTP backend settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Seeded administrator account
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdminSeed {
    #[serde(default = "default_admin_email")]
    pub email: String,

    #[serde(default = "default_admin_name")]
    pub name: String,

    #[serde(default = "default_admin_password")]
    pub password: String,
}

fn default_data_dir() -> String {
    "~/.portal/data".to_string()
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_admin_email() -> String {
    "admin@muhantrading.com".to_string()
}

fn default_admin_name() -> String {
    "Administrator".to_string()
}

fn default_admin_password() -> String {
    "admin123".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            server: ServerConfig::default(),
            admin: AdminSeed::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Default for AdminSeed {
    fn default() -> Self {
        Self {
            email: default_admin_email(),
            name: default_admin_name(),
            password: default_admin_password(),
        }
    }
}

/// Default config file location
pub fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".portal")
        .join("config.toml")
}

impl Config {
    /// Load from the default location; a missing file means defaults.
    /// Environment overrides are applied in both cases.
    pub fn load() -> Result<Self> {
        let path = config_path();
        let mut config = if path.exists() {
            Self::parse_file(&path)?
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from an explicit path, which must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::parse_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn parse_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Apply PORTAL_DATA_DIR, PORTAL_BIND and PORTAL_PORT
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("PORTAL_DATA_DIR") {
            self.data_dir = dir;
        }

        if let Ok(bind) = std::env::var("PORTAL_BIND") {
            self.server.bind = bind;
        }

        if let Ok(port) = std::env::var("PORTAL_PORT") {
            match port.parse() {
                Ok(p) => self.server.port = p,
                Err(e) => tracing::warn!("Invalid PORTAL_PORT value {port:?}: {e}"),
            }
        }
    }

    /// Expand ~ in data_dir
    pub fn resolve_data_dir(&self) -> PathBuf {
        if let Some(rest) = self.data_dir.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(&self.data_dir)
    }
}
