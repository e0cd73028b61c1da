use covid_audit::{AuditLogger, FaultLog, FileFaultLog};
use covid_core::{AppConfig, CovidEstimator, Estimator};
use std::collections::HashSet;
use std::sync::Arc;

use crate::encoder::XmlOptions;

/// Shared application state.
///
/// Built once at startup; every handle inside is shared by all requests.
#[derive(Clone)]
pub struct AppState {
    pub estimator: Arc<dyn Estimator>,
    pub audit: Arc<AuditLogger>,
    pub faults: Arc<dyn FaultLog>,
    pub xml: Arc<XmlOptions>,
    base_path: Arc<str>,
    record_log_reads: bool,
    excluded_paths: Arc<HashSet<String>>,
}

impl AppState {
    pub fn new(
        estimator: Arc<dyn Estimator>,
        audit: Arc<AuditLogger>,
        faults: Arc<dyn FaultLog>,
    ) -> Self {
        let defaults = AppConfig::default();
        Self {
            estimator,
            audit,
            faults,
            xml: Arc::new(XmlOptions::default()),
            base_path: Arc::from(defaults.server.base()),
            record_log_reads: defaults.audit.record_log_reads,
            excluded_paths: Arc::new(HashSet::new()),
        }
    }

    /// Build the production state: COVID-19 estimator, configured audit
    /// store and file fault log.
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(
            Arc::new(CovidEstimator::new()),
            Arc::new(AuditLogger::new(&cfg.audit)),
            Arc::new(FileFaultLog::new(cfg.faults.path.clone())),
        )
        .with_base_path(cfg.server.base())
        .with_xml_options(XmlOptions::from_config(&cfg.encoding))
        .with_record_log_reads(cfg.audit.record_log_reads)
        .with_excluded_paths(cfg.audit.exclude_paths.iter().cloned())
    }

    pub fn with_base_path(mut self, base_path: &str) -> Self {
        self.base_path = Arc::from(base_path.trim_end_matches('/'));
        self
    }

    pub fn with_xml_options(mut self, xml: XmlOptions) -> Self {
        self.xml = Arc::new(xml);
        self
    }

    pub fn with_record_log_reads(mut self, record: bool) -> Self {
        self.record_log_reads = record;
        self
    }

    pub fn with_excluded_paths(mut self, paths: impl IntoIterator<Item = String>) -> Self {
        self.excluded_paths = Arc::new(paths.into_iter().collect());
        self
    }

    /// Versioned prefix of the estimation routes, without trailing slash.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn logs_path(&self) -> String {
        format!("{}/logs", self.base_path)
    }

    /// Whether a request to `path` produces an audit record.
    pub fn is_audited(&self, path: &str) -> bool {
        if !self.audit.is_enabled() || self.excluded_paths.contains(path) {
            return false;
        }
        self.record_log_reads || path != self.logs_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covid_audit::NullStore;

    fn state() -> AppState {
        AppState::new(
            Arc::new(CovidEstimator::new()),
            Arc::new(AuditLogger::with_store(Arc::new(NullStore::new()))),
            Arc::new(FileFaultLog::new("unused-error-log.txt")),
        )
    }

    #[test]
    fn test_log_reads_are_not_audited_by_default() {
        let state = state();
        assert!(state.is_audited("/api/v1/on-covid-19/json"));
        assert!(!state.is_audited("/api/v1/on-covid-19/logs"));
        assert!(state.with_record_log_reads(true).is_audited("/api/v1/on-covid-19/logs"));
    }

    #[test]
    fn test_excluded_paths_and_disabled_audit() {
        let state = state().with_excluded_paths(["/".to_string()]);
        assert!(!state.is_audited("/"));

        let disabled = AppState::new(
            Arc::new(CovidEstimator::new()),
            Arc::new(AuditLogger::disabled()),
            Arc::new(FileFaultLog::new("unused-error-log.txt")),
        );
        assert!(!disabled.is_audited("/api/v1/on-covid-19/json"));
    }

    #[test]
    fn test_base_path_drops_trailing_slash() {
        let state = state().with_base_path("/api/v2/estimates/");
        assert_eq!(state.base_path(), "/api/v2/estimates");
        assert_eq!(state.logs_path(), "/api/v2/estimates/logs");
    }
}
