//! Audit storage backends.
//!
//! - [`LedgerStore`]: one JSON line per record, appended without reading.
//! - [`SnapshotStore`]: one JSON document mapping timestamp to record,
//!   loaded, extended and rewritten on every append.
//! - [`NullStore`]: discards everything (auditing disabled).

use crate::error::AuditError;
use crate::ledger::{Ledger, ensure_parent_dir};
use crate::record::AuditRecord;
use async_trait::async_trait;
use covid_core::config::{AuditConfig, StorageMode};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;

/// Trait for audit storage backends.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Durably store one record.
    async fn append(&self, record: AuditRecord) -> Result<(), AuditError>;

    /// Read every stored record.
    async fn read_all(&self) -> Result<Vec<AuditRecord>, AuditError>;
}

/// Create a storage backend based on configuration.
pub fn create_store(config: &AuditConfig) -> Arc<dyn AuditStore> {
    let path = config.resolved_path();
    tracing::info!(mode = %config.mode, path = %path.display(), "Audit store ready");
    match config.mode {
        StorageMode::Ledger => Arc::new(LedgerStore::new(path)),
        StorageMode::Snapshot => Arc::new(SnapshotStore::new(path)),
    }
}

/// Discards records.
#[derive(Debug, Default)]
pub struct NullStore;

impl NullStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditStore for NullStore {
    async fn append(&self, _record: AuditRecord) -> Result<(), AuditError> {
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<AuditRecord>, AuditError> {
        Ok(Vec::new())
    }
}

/// Ledger storage (appends to a JSON Lines file).
///
/// Records come back in the order their appends completed.
#[derive(Debug)]
pub struct LedgerStore {
    ledger: Ledger<AuditRecord>,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            ledger: Ledger::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.ledger.path()
    }
}

#[async_trait]
impl AuditStore for LedgerStore {
    async fn append(&self, record: AuditRecord) -> Result<(), AuditError> {
        self.ledger.append(&record).await
    }

    async fn read_all(&self) -> Result<Vec<AuditRecord>, AuditError> {
        self.ledger.read_all().await
    }
}

/// Snapshot storage (one JSON map document, rewritten per append).
///
/// Every load-insert-store cycle runs under `write_lock`, so concurrent
/// appends through the same store never overwrite each other. The store
/// must be the only writer of its file.
#[derive(Debug)]
pub struct SnapshotStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<i64, AuditRecord>, AuditError> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(BTreeMap::new());
        }

        serde_json::from_slice(&raw).map_err(|source| AuditError::MalformedDocument {
            path: self.path.clone(),
            source,
        })
    }

    /// Write the document to a sibling file, then rename it into place.
    async fn persist(&self, records: &BTreeMap<i64, AuditRecord>) -> Result<(), AuditError> {
        let document = serde_json::to_vec_pretty(records)?;

        ensure_parent_dir(&self.path).await?;
        let staging = staging_path(&self.path);
        fs::write(&staging, document).await?;
        fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl AuditStore for SnapshotStore {
    async fn append(&self, record: AuditRecord) -> Result<(), AuditError> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.load().await?;
        let key = free_slot(&records, record.timestamp);
        records.insert(key, record);
        self.persist(&records).await
    }

    async fn read_all(&self) -> Result<Vec<AuditRecord>, AuditError> {
        Ok(self.load().await?.into_values().collect())
    }
}

/// First key at or after `timestamp` that is not taken yet.
fn free_slot(records: &BTreeMap<i64, AuditRecord>, timestamp: i64) -> i64 {
    let mut key = timestamp;
    while records.contains_key(&key) {
        key += 1;
    }
    key
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
