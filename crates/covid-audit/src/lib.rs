//! # covid-audit
//!
//! Request auditing for the covid-estimator service.
//!
//! This crate provides:
//! - [`AuditRecord`]: one completed request (method, path, status, duration)
//! - [`AuditStore`]: durable append / full read, with two interchangeable
//!   backends ([`LedgerStore`], [`SnapshotStore`])
//! - [`FaultLog`]: the durable record of unhandled failures
//!
//! ## Storage modes
//!
//! | Mode | File | Append |
//! |------|------|--------|
//! | ledger | JSON Lines | one independent write per record |
//! | snapshot | one JSON map `timestamp -> record` | load, insert, rewrite (serialized) |
//!
//! Both modes read a missing or empty file as "no records yet".
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use covid_audit::{AuditLogger, AuditRecord};
//! use covid_core::AuditConfig;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let logger = AuditLogger::new(&AuditConfig::default());
//!
//! logger.log(
//!     AuditRecord::builder("/api/v1/on-covid-19/json")
//!         .method("POST")
//!         .status_code(200)
//!         .duration(Duration::from_millis(4))
//!         .build(),
//! ).await?;
//!
//! for record in logger.read_all().await? {
//!     println!("{}", record.to_log_line());
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod fault;
pub mod ledger;
pub mod logger;
pub mod record;
pub mod storage;

pub use error::AuditError;
pub use fault::{FaultEntry, FaultLog, FileFaultLog};
pub use ledger::Ledger;
pub use logger::AuditLogger;
pub use record::{AuditRecord, AuditRecordBuilder};
pub use storage::{AuditStore, LedgerStore, NullStore, SnapshotStore, create_store};
