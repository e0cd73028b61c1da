//! Fault log.
//!
//! Unhandled failures are recorded here with their full diagnostic chain.
//! The fault log is never exposed over HTTP.

use crate::error::AuditError;
use crate::ledger::Ledger;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One recorded failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultEntry {
    pub fault_id: Uuid,
    pub occurred_at: DateTime<Utc>,

    /// Fault class, e.g. "decode", "estimation", "panic".
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Top-level error message.
    pub message: String,

    /// Error sources below `message`, outermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
}

impl FaultEntry {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            fault_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            kind: kind.into(),
            method: None,
            path: None,
            message: message.into(),
            causes: Vec::new(),
        }
    }

    /// Build an entry from an error, walking its `source()` chain.
    pub fn from_error(kind: impl Into<String>, err: &(dyn std::error::Error + 'static)) -> Self {
        let mut entry = Self::new(kind, err.to_string());
        let mut source = err.source();
        while let Some(cause) = source {
            entry.causes.push(cause.to_string());
            source = cause.source();
        }
        entry
    }

    pub fn with_request(mut self, method: impl Into<String>, path: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self.path = Some(path.into());
        self
    }
}

/// Durable sink for fault entries.
#[async_trait]
pub trait FaultLog: Send + Sync {
    async fn append(&self, entry: FaultEntry) -> Result<(), AuditError>;

    async fn read_all(&self) -> Result<Vec<FaultEntry>, AuditError>;
}

/// Fault log backed by a JSON Lines file.
#[derive(Debug)]
pub struct FileFaultLog {
    ledger: Ledger<FaultEntry>,
}

impl FileFaultLog {
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
impl FaultLog for FileFaultLog {
    async fn append(&self, entry: FaultEntry) -> Result<(), AuditError> {
        tracing::debug!(
            fault_id = %entry.fault_id,
            kind = %entry.kind,
            "Fault recorded"
        );
        self.ledger.append(&entry).await
    }

    async fn read_all(&self) -> Result<Vec<FaultEntry>, AuditError> {
        self.ledger.read_all().await
    }
}
