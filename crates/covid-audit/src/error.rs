//! Error types for the audit crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during audit and fault log operations.
#[derive(Debug, Error)]
pub enum AuditError {
    /// A snapshot document could not be parsed.
    #[error("malformed audit document {path}")]
    MalformedDocument {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_malformed_document_reports_parse_error_once() {
        let source = serde_json::from_str::<serde_json::Value>("[1, 2").unwrap_err();
        let parse_message = source.to_string();
        let err = AuditError::MalformedDocument {
            path: PathBuf::from("audit-log.json"),
            source,
        };

        assert_eq!(err.to_string(), "malformed audit document audit-log.json");
        assert!(!err.to_string().contains(&parse_message));
        assert_eq!(err.source().unwrap().to_string(), parse_message);
    }
}
