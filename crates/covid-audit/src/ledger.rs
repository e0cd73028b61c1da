//! Append-only JSON Lines files.
//!
//! A [`Ledger`] is opened per operation and never truncated. Each append is a
//! single write of one newline-terminated JSON object, so concurrent appends
//! never need to coordinate.

use crate::error::AuditError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// JSON Lines file holding entries of type `T`.
#[derive(Debug)]
pub struct Ledger<T> {
    path: PathBuf,
    _entries: PhantomData<fn() -> T>,
}

impl<T> Ledger<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _entries: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry as a single line.
    pub async fn append(&self, entry: &T) -> Result<(), AuditError> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        ensure_parent_dir(&self.path).await?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Read every entry in the order it was appended.
    ///
    /// A missing file reads as empty. Lines that fail to parse are skipped.
    pub async fn read_all(&self) -> Result<Vec<T>, AuditError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for (line_num, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<T>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse entry on line {} of {}: {}",
                        line_num + 1,
                        self.path.display(),
                        e
                    );
                }
            }
        }

        Ok(entries)
    }
}

/// Create the parent directory of `file_path` if it has one.
pub(crate) async fn ensure_parent_dir(file_path: &Path) -> Result<(), AuditError> {
    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}
