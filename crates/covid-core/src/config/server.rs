//! HTTP server and response encoding configuration.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use super::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address, e.g. "0.0.0.0:3000"
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Versioned prefix for every estimation route.
    #[serde(default = "default_base_path")]
    pub base_path: String,
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_base_path() -> String {
    "/api/v1/on-covid-19".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            base_path: default_base_path(),
        }
    }
}

impl ServerConfig {
    /// Replace the port of `bind`, keeping the host.
    pub fn set_port(&mut self, port: &str) -> Result<(), ConfigError> {
        let port: u16 = port
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidPort(port.to_string()))?;
        let mut addr = self.socket_addr()?;
        addr.set_port(port);
        self.bind = addr.to_string();
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::InvalidBind(self.bind.clone()))
    }

    /// `base_path` without a trailing slash.
    pub fn base(&self) -> &str {
        self.base_path.trim_end_matches('/')
    }

    pub fn validate_base_path(&self) -> Result<(), ConfigError> {
        let base = self.base();
        if !base.starts_with('/') || base.len() < 2 {
            return Err(ConfigError::InvalidBasePath(self.base_path.clone()));
        }
        Ok(())
    }
}

/// Markup encoding knobs for estimation responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// Root element wrapping the estimation output. Empty means no root.
    #[serde(default = "default_xml_root")]
    pub xml_root: String,

    /// Whether to emit `<?xml version="1.0" encoding="UTF-8"?>`.
    #[serde(default = "default_xml_declaration")]
    pub xml_declaration: bool,
}

fn default_xml_root() -> String {
    "estimate".to_string()
}

fn default_xml_declaration() -> bool {
    true
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            xml_root: default_xml_root(),
            xml_declaration: default_xml_declaration(),
        }
    }
}
