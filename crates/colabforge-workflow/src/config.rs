//! Workflow configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Compression used for batch export archives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveCompression {
    #[default]
    Deflated,
    Stored,
}

/// Workflow configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// File name of the batch export archive
    pub archive_file_name: String,
    /// Extension appended to notebook file names
    pub notebook_extension: String,
    /// Prefix for tasks created without a title
    pub default_title_prefix: String,
    /// Archive compression
    pub compression: ArchiveCompression,
}

impl WorkflowConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_archive_file_name(mut self, name: impl Into<String>) -> Self {
        self.archive_file_name = name.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_notebook_extension(mut self, extension: impl Into<String>) -> Self {
        self.notebook_extension = extension.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_compression(mut self, compression: ArchiveCompression) -> Self {
        self.compression = compression;
        self
    }

    /// Parse configuration from TOML; missing keys take defaults
    ///
    /// # Errors
    /// `ConfigError::Parse` on invalid TOML or unknown values.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Read configuration from a TOML file
    ///
    /// # Errors
    /// `ConfigError::Io` if the file cannot be read, otherwise see
    /// [`WorkflowConfig::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Title for a task created without one
    #[must_use]
    pub fn generated_title(&self) -> String {
        format!("{} - {}", self.default_title_prefix, uuid::Uuid::new_v4())
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            archive_file_name: "approved_tasks.zip".to_string(),
            notebook_extension: ".ipynb".to_string(),
            default_title_prefix: "New Task".to_string(),
            compression: ArchiveCompression::Deflated,
        }
    }
}
