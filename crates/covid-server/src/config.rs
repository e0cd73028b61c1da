//! Configuration loading for the server binary.
//!
//! Lookup order for the config file: `--config`, then `COVID_SERVER_CONFIG`,
//! then `config.toml` in the working directory. Only the last one may be
//! missing. `PORT` then overrides the port of `server.bind`.

use covid_core::{AppConfig, ConfigError};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "COVID_SERVER_CONFIG";
pub const PORT_ENV: &str = "PORT";
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Where the config file comes from, and whether it must exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub path: PathBuf,
    pub required: bool,
}

pub fn resolve_config_path(explicit: Option<&Path>, from_env: Option<&str>) -> ConfigSource {
    if let Some(path) = explicit {
        return ConfigSource {
            path: path.to_path_buf(),
            required: true,
        };
    }
    match from_env.filter(|v| !v.trim().is_empty()) {
        Some(path) => ConfigSource {
            path: PathBuf::from(path),
            required: true,
        },
        None => ConfigSource {
            path: PathBuf::from(DEFAULT_CONFIG_FILE),
            required: false,
        },
    }
}

/// Read the config file named by `source`, apply overrides and validate.
pub fn load_from(source: &ConfigSource, port: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut cfg = if !source.required && !source.path.exists() {
        tracing::debug!(path = %source.path.display(), "No config file, using defaults");
        AppConfig::default()
    } else {
        AppConfig::from_file(&source.path)?
    };

    if let Some(port) = port.filter(|p| !p.trim().is_empty()) {
        cfg.server.set_port(port)?;
    }

    cfg.validate()?;
    Ok(cfg)
}

/// Load configuration using the process environment.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let from_env = std::env::var(CONFIG_ENV).ok();
    let port = std::env::var(PORT_ENV).ok();
    let source = resolve_config_path(explicit, from_env.as_deref());
    load_from(&source, port.as_deref())
}
