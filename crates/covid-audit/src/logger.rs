//! Audit logger implementation.
//!
//! [`AuditLogger`] is the handle the HTTP layer records completed requests
//! through. It owns the configured [`AuditStore`] and mirrors every record
//! into `tracing`.

use covid_core::AuditConfig;
use std::sync::Arc;

use crate::error::AuditError;
use crate::record::AuditRecord;
use crate::storage::{AuditStore, NullStore, create_store};

/// The main audit logger.
pub struct AuditLogger {
    enabled: bool,
    store: Arc<dyn AuditStore>,
}

impl AuditLogger {
    /// Create a new audit logger with the given configuration.
    pub fn new(config: &AuditConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        Self {
            enabled: true,
            store: create_store(config),
        }
    }

    /// Create a logger with a custom storage backend.
    pub fn with_store(store: Arc<dyn AuditStore>) -> Self {
        Self {
            enabled: true,
            store,
        }
    }

    /// Create a disabled (no-op) logger.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            store: Arc::new(NullStore::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record one completed request.
    pub async fn log(&self, record: AuditRecord) -> Result<(), AuditError> {
        if !self.enabled {
            return Ok(());
        }

        tracing::debug!(
            method = record.method.as_deref().unwrap_or("-"),
            path = %record.path,
            status = record.status_code,
            duration_ms = record.duration_ms,
            "Audit record"
        );

        self.store.append(record).await
    }

    /// Read every recorded request.
    pub async fn read_all(&self) -> Result<Vec<AuditRecord>, AuditError> {
        self.store.read_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covid_core::config::StorageMode;

    #[tokio::test]
    async fn test_disabled_logger() {
        let logger = AuditLogger::disabled();
        assert!(!logger.is_enabled());

        logger.log(AuditRecord::builder("/").build()).await.unwrap();
        assert!(logger.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_config_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit-log.txt");
        let logger = AuditLogger::new(&AuditConfig {
            enabled: false,
            path: Some(path.clone()),
            ..Default::default()
        });

        logger.log(AuditRecord::builder("/").build()).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_logger_round_trips_through_configured_store() {
        let dir = tempfile::tempdir().unwrap();
        for mode in [StorageMode::Ledger, StorageMode::Snapshot] {
            let logger = AuditLogger::new(&AuditConfig {
                mode,
                path: Some(dir.path().join(mode.default_path())),
                ..Default::default()
            });

            logger
                .log(AuditRecord::builder("/api/v1/on-covid-19").method("POST").build())
                .await
                .unwrap();

            let records = logger.read_all().await.unwrap();
            assert_eq!(records.len(), 1, "mode {mode}");
            assert_eq!(records[0].method.as_deref(), Some("POST"));
        }
    }
}
