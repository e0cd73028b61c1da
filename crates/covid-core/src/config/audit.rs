//! Audit and fault log configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the request audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Whether completed requests are recorded at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Storage backend for audit records.
    #[serde(default)]
    pub mode: StorageMode,

    /// Audit file path. Defaults depend on `mode`.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Whether reads of the audit report are themselves recorded.
    ///
    /// Off by default so that two consecutive reads return the same report.
    #[serde(default)]
    pub record_log_reads: bool,

    /// Request paths (without query) that are never recorded.
    #[serde(default)]
    pub exclude_paths: Vec<String>,
}

/// Audit storage backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// One JSON line appended per record.
    #[default]
    Ledger,
    /// One JSON document mapping timestamp to record, rewritten per append.
    Snapshot,
}

impl StorageMode {
    /// File used when no explicit `path` is configured.
    pub fn default_path(self) -> &'static str {
        match self {
            Self::Ledger => "audit-log.txt",
            Self::Snapshot => "audit-log.json",
        }
    }
}

impl std::fmt::Display for StorageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ledger => write!(f, "ledger"),
            Self::Snapshot => write!(f, "snapshot"),
        }
    }
}

impl AuditConfig {
    /// The audit file this configuration points at.
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.mode.default_path()))
    }

    /// Whether requests to `path` skip auditing.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude_paths.iter().any(|p| p == path)
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            mode: StorageMode::default(),
            path: None,
            record_log_reads: false,
            exclude_paths: Vec::new(),
        }
    }
}

/// Configuration for the fault log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultConfig {
    /// Fault log file path (JSON Lines).
    #[serde(default = "default_fault_path")]
    pub path: PathBuf,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            path: default_fault_path(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_fault_path() -> PathBuf {
    PathBuf::from("error-log.txt")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_path_follows_mode() {
        let mut config = AuditConfig::default();
        assert_eq!(config.resolved_path(), PathBuf::from("audit-log.txt"));

        config.mode = StorageMode::Snapshot;
        assert_eq!(config.resolved_path(), PathBuf::from("audit-log.json"));

        config.path = Some(PathBuf::from("/var/log/covid/audit.json"));
        assert_eq!(
            config.resolved_path(),
            PathBuf::from("/var/log/covid/audit.json")
        );
    }

    #[test]
    fn test_is_excluded_matches_exact_path() {
        let config = AuditConfig {
            exclude_paths: vec!["/healthz".to_string()],
            ..Default::default()
        };
        assert!(config.is_excluded("/healthz"));
        assert!(!config.is_excluded("/healthz/deep"));
    }
}
