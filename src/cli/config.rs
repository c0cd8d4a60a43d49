//! Configuration file
//!
//! ```json
//! {
//!   "data_dir": "./formbuilder-data",
//!   "storage_key": "upliance_forms_v1",
//!   "max_derived_passes": 5,
//!   "comparator": "string",
//!   "log_filter": "formbuilder=info"
//! }
//! ```
//!
//! Only `data_dir` is required.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{CliError, CliResult};
use crate::resolver::{ComparatorKind, DerivedResolver, DEFAULT_MAX_PASSES};
use crate::store::{JsonFileStorage, DEFAULT_STORAGE_KEY};

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Data directory (required)
    pub data_dir: String,

    /// File stem of the saved-forms document
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Cap on derived-field resolution passes
    #[serde(default = "default_max_derived_passes")]
    pub max_derived_passes: usize,

    /// Change detection between passes
    #[serde(default)]
    pub comparator: ComparatorKind,

    /// tracing filter directive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

fn default_max_derived_passes() -> usize {
    DEFAULT_MAX_PASSES
}

impl Config {
    /// Defaults for everything but the data directory.
    pub fn with_data_dir(data_dir: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            storage_key: default_storage_key(),
            max_derived_passes: default_max_derived_passes(),
            comparator: ComparatorKind::default(),
            log_filter: None,
        }
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> CliResult<Self> {
        let config: Config = serde_json::from_str(content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as pretty JSON.
    pub fn write(&self, path: &Path) -> CliResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> CliResult<()> {
        if self.data_dir.trim().is_empty() {
            return Err(CliError::config_error("data_dir must not be empty"));
        }

        if self.storage_key.is_empty()
            || self
                .storage_key
                .chars()
                .any(|c| c == '/' || c == '\\' || c == '.')
        {
            return Err(CliError::config_error(format!(
                "Invalid storage_key: '{}'. Use a plain file stem.",
                self.storage_key
            )));
        }

        if self.max_derived_passes == 0 {
            return Err(CliError::config_error("max_derived_passes must be >= 1"));
        }

        Ok(())
    }

    /// Get data directory as Path
    pub fn data_path(&self) -> &Path {
        Path::new(&self.data_dir)
    }

    pub fn storage(&self) -> JsonFileStorage {
        JsonFileStorage::new(self.data_path(), &self.storage_key)
    }

    /// Resolver with the configured cap and comparator.
    pub fn resolver(&self) -> DerivedResolver {
        DerivedResolver::new()
            .with_max_passes(self.max_derived_passes)
            .with_comparator(self.comparator.build())
    }
}
