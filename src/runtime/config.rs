//! Runtime configuration for an import run, loaded from a JSON file.
//!
//! All instances must pass [`ImportConfig::validate`] before any consumer
//! observes the values; [`ImportConfig::from_file`] validates on load.

use crate::catalog::options::{CatalogClientOptions, DEFAULT_MIN_INTERVAL_MS};
use crate::importer::processor::MissingParentPolicy;
use crate::mapper::MappingConfig;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.bigcommerce.com";
const DEFAULT_API_VERSION: &str = "v3";
const DEFAULT_MAX_ATTEMPTS: usize = 5;
const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImportConfig {
    pub catalog: CatalogSettings,
    pub import: ImportSettings,
    pub mapping: MappingConfig,
    #[serde(default)]
    pub client: ClientSettings,
    /// Path of the SQLite progress database.
    #[serde(default = "default_ledger_path")]
    pub ledger_path: String,
}

/// Remote catalog account and endpoint settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogSettings {
    pub store_hash: String,
    pub api_token: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl CatalogSettings {
    /// Versioned API root for this store, without a trailing slash.
    pub fn api_base_url(&self) -> String {
        format!(
            "{}/stores/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.store_hash,
            self.api_version
        )
    }
}

/// What to import and where to attach it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImportSettings {
    pub tree_id: i64,
    #[serde(default)]
    pub default_parent_id: Option<i64>,
    #[serde(default)]
    pub missing_parent_policy: MissingParentPolicy,
}

/// Throttle, retry, and timeout knobs for the HTTP client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub min_interval_ms: u64,
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ImportConfig {
    /// Loads and validates a configuration file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self =
            serde_json::from_str(&raw).context("config file is not valid import configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn client_options(&self) -> CatalogClientOptions {
        CatalogClientOptions {
            request_timeout: Duration::from_secs(self.client.request_timeout_secs),
            min_interval: Duration::from_millis(self.client.min_interval_ms),
            max_attempts: self.client.max_attempts,
            base_delay: Duration::from_millis(self.client.base_delay_ms),
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure_not_empty(&self.catalog.store_hash, "catalog.store_hash")?;
        ensure_not_empty(&self.catalog.api_token, "catalog.api_token")?;
        ensure_not_empty(&self.catalog.api_version, "catalog.api_version")?;

        let base_url = self.catalog.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            bail!("catalog.base_url must start with http:// or https://");
        }

        if self.import.tree_id <= 0 {
            bail!("import.tree_id must be a positive integer");
        }

        if let Some(parent_id) = self.import.default_parent_id {
            if parent_id <= 0 {
                bail!("import.default_parent_id must be a positive integer when set");
            }
        }

        ensure_not_empty(&self.mapping.name, "mapping.name")?;
        ensure_not_empty(&self.ledger_path, "ledger_path")?;

        self.client_options().validate()
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_ledger_path() -> String {
    "import_progress.db".to_string()
}

fn ensure_not_empty(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{field} cannot be empty");
    }
    Ok(())
}
