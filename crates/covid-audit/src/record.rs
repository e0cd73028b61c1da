//! Audit record type.
//!
//! One [`AuditRecord`] describes one completed HTTP request: what was asked
//! (`method`, `path`), what was answered (`statusCode`) and how long it took
//! (`durationMs`). Records are created once the response has been sent and
//! never change afterwards.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One observation of a completed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// Completion time in milliseconds since the Unix epoch.
    pub timestamp: i64,

    /// HTTP verb of the originating request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Route plus query string, as received.
    pub path: String,

    /// Status code that was sent.
    pub status_code: u16,

    /// Wall-clock time from request received to response sent.
    pub duration_ms: u64,
}

impl AuditRecord {
    /// Create a builder for a record about `path`.
    pub fn builder(path: impl Into<String>) -> AuditRecordBuilder {
        AuditRecordBuilder::new(path)
    }

    /// Completion time as a UTC datetime.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }

    /// Format the record as one delimited report line.
    ///
    /// Format: `METHOD\t\tPATH\t\tSTATUS\t\tDURATION ms`
    pub fn to_log_line(&self) -> String {
        format!(
            "{}\t\t{}\t\t{}\t\t{} ms",
            self.method.as_deref().unwrap_or("-"),
            self.path,
            self.status_code,
            self.duration_ms,
        )
    }
}

/// Builder for audit records.
#[derive(Debug)]
pub struct AuditRecordBuilder {
    record: AuditRecord,
}

impl AuditRecordBuilder {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            record: AuditRecord {
                timestamp: Utc::now().timestamp_millis(),
                method: None,
                path: path.into(),
                status_code: 200,
                duration_ms: 0,
            },
        }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.record.method = Some(method.into());
        self
    }

    pub fn status_code(mut self, status: u16) -> Self {
        self.record.status_code = status;
        self
    }

    /// Set the elapsed time, truncated to whole milliseconds.
    pub fn duration(mut self, elapsed: Duration) -> Self {
        self.record.duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.record.timestamp = at.timestamp_millis();
        self
    }

    pub fn timestamp_ms(mut self, timestamp: i64) -> Self {
        self.record.timestamp = timestamp;
        self
    }

    pub fn build(self) -> AuditRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_truncates_duration() {
        let record = AuditRecord::builder("/api/v1/on-covid-19/json")
            .method("POST")
            .status_code(200)
            .duration(Duration::from_micros(12_999))
            .build();

        assert_eq!(record.method.as_deref(), Some("POST"));
        assert_eq!(record.duration_ms, 12);
        assert!(record.completed_at().is_some());
    }

    #[test]
    fn test_to_log_line() {
        let record = AuditRecord::builder("/api/v1/on-covid-19/xml?pretty=1")
            .method("POST")
            .status_code(500)
            .duration(Duration::from_millis(7))
            .build();

        assert_eq!(
            record.to_log_line(),
            "POST\t\t/api/v1/on-covid-19/xml?pretty=1\t\t500\t\t7 ms"
        );
    }

    #[test]
    fn test_log_line_without_method() {
        let record = AuditRecord::builder("/").build();
        assert!(record.to_log_line().starts_with("-\t\t/\t\t200"));
    }

    #[test]
    fn test_wire_form_is_camel_case() {
        let record = AuditRecord::builder("/")
            .method("GET")
            .timestamp_ms(1_700_000_000_000)
            .duration(Duration::from_millis(3))
            .build();

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["timestamp"], 1_700_000_000_000_i64);
        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["durationMs"], 3);

        let missing_method: AuditRecord = serde_json::from_str(
            r#"{"timestamp":1,"path":"/","statusCode":404,"durationMs":0}"#,
        )
        .unwrap();
        assert_eq!(missing_method.method, None);
    }
}
