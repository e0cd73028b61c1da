//! # covid-core
//!
//! Types shared by every covid-estimator crate:
//!
//! - [`config`]: the TOML-backed service configuration ([`AppConfig`]).
//! - [`estimator`]: the [`Estimator`] collaborator invoked by the HTTP
//!   pipeline, plus [`CovidEstimator`], the COVID-19 impact projection.
//!
//! The pipeline only ever sees estimator input and output as
//! [`serde_json::Value`]; shape validation is the estimator's job.

pub mod config;
pub mod estimator;

pub use config::{AppConfig, AuditConfig, ConfigError, EncodingConfig, FaultConfig, ServerConfig, StorageMode};
pub use estimator::{CovidEstimator, EstimateError, EstimationInput, Estimator, Impact, PeriodType, Region};
