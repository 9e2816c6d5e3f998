//! Configuration management for the datasource layer

use crate::error::{DataError, Result};
use crate::headers::parse_header_args;
use crate::reader::ReaderOptions;
use crate::registry::DataRegistry;
use crate::vault::VaultConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Datasource configuration
///
/// ```yaml
/// datasources:
///   - config.yaml                        # alias "config"
///   - api=https://api.example.com/v1/items.json
///   - secrets=vault:///secret/app
/// datasource_headers:
///   - "api=Authorization: Bearer abc123"
/// http_timeout_secs: 5
/// vault:
///   address: https://vault.example.com:8200
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataConfig {
    /// Datasource specifications, `alias=uri` or a bare filename
    #[serde(default)]
    pub datasources: Vec<String>,

    /// Request headers per datasource, `alias=Name: value`
    #[serde(default)]
    pub datasource_headers: Vec<String>,

    /// Timeout for HTTP datasources in seconds (default: 5)
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Vault settings for `vault:` datasources
    #[serde(default)]
    pub vault: VaultConfig,
}

fn default_http_timeout() -> u64 {
    5
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            datasources: Vec::new(),
            datasource_headers: Vec::new(),
            http_timeout_secs: default_http_timeout(),
            vault: VaultConfig::default(),
        }
    }
}

impl DataConfig {
    /// Load configuration from a YAML file
    ///
    /// # Returns
    /// * `Ok(DataConfig)` if loading and validation succeed
    /// * `Err(DataError)` if the file cannot be read or the config is invalid
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            DataError::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: DataConfig = serde_yaml::from_str(content)
            .map_err(|e| DataError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Validation Rules
    /// - http_timeout_secs must be > 0
    /// - vault.timeout_secs must be > 0 when set
    /// - datasource entries must not be empty
    /// - datasource_headers must all be `alias=Name: value`
    pub fn validate(&self) -> Result<()> {
        if self.http_timeout_secs == 0 {
            return Err(DataError::Config(
                "http_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.vault.timeout_secs == Some(0) {
            return Err(DataError::Config(
                "vault.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.datasources.iter().any(|d| d.trim().is_empty()) {
            return Err(DataError::Config(
                "datasource entries must not be empty".to_string(),
            ));
        }

        parse_header_args(&self.datasource_headers)?;
        Ok(())
    }

    /// Append datasources and headers given on the command line
    pub fn extend(&mut self, datasources: &[String], headers: &[String]) {
        self.datasources.extend_from_slice(datasources);
        self.datasource_headers.extend_from_slice(headers);
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn reader_options(&self) -> ReaderOptions {
        ReaderOptions {
            http_timeout: self.http_timeout(),
            vault: self.vault.clone(),
        }
    }

    /// Validate and build a registry with the standard readers
    pub fn build_registry(&self) -> Result<DataRegistry> {
        self.validate()?;
        DataRegistry::from_args(
            &self.datasources,
            &self.datasource_headers,
            &self.reader_options(),
        )
    }
}
