//! Configuration types for the covid-estimator service.
//!
//! Configuration is a single TOML document:
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:3000"
//! base_path = "/api/v1/on-covid-19"
//!
//! [audit]
//! mode = "ledger"          # or "snapshot"
//! path = "audit-log.txt"
//!
//! [faults]
//! path = "error-log.txt"
//!
//! [encoding]
//! xml_root = "estimate"
//! xml_declaration = true
//! ```
//!
//! Every section and field is optional.

pub mod audit;
pub mod server;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use audit::{AuditConfig, FaultConfig, StorageMode};
pub use server::{EncodingConfig, ServerConfig};

/// Complete service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub faults: FaultConfig,

    #[serde(default)]
    pub encoding: EncodingConfig,
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid bind address: {0}")]
    InvalidBind(String),

    #[error("invalid port: {0}")]
    InvalidPort(String),

    #[error("base_path must start with '/' and name at least one segment, got {0:?}")]
    InvalidBasePath(String),
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check values serde cannot check on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.socket_addr()?;
        self.server.validate_base_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_document_uses_defaults() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.server.bind, "0.0.0.0:3000");
        assert_eq!(cfg.server.base_path, "/api/v1/on-covid-19");
        assert!(cfg.audit.enabled);
        assert_eq!(cfg.audit.mode, StorageMode::Ledger);
        assert_eq!(cfg.faults.path, PathBuf::from("error-log.txt"));
        assert_eq!(cfg.encoding.xml_root, "estimate");
    }

    #[test]
    fn test_from_file_reads_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
bind = "127.0.0.1:9000"

[audit]
mode = "snapshot"
exclude_paths = ["/"]

[encoding]
xml_root = ""
xml_declaration = false
"#
        )
        .unwrap();

        let cfg = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:9000");
        assert_eq!(cfg.audit.mode, StorageMode::Snapshot);
        assert_eq!(cfg.audit.resolved_path(), PathBuf::from("audit-log.json"));
        assert!(cfg.audit.is_excluded("/"));
        assert!(cfg.encoding.xml_root.is_empty());
        assert!(!cfg.encoding.xml_declaration);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());

        cfg.server.base_path = "/".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidBasePath(_))));

        cfg.server.base_path = "/api".to_string();
        cfg.server.bind = "localhost".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidBind(_))));
    }

    #[test]
    fn test_from_file_reports_missing_file() {
        let err = AppConfig::from_file("/nonexistent/covid.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_from_file_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[audit]\nmode = \"sqlite\"").unwrap();
        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
