//! Engine configuration.

use std::path::{Path, PathBuf};

use crate::error::CoreError;

/// Engine configuration, loaded from JSON. Every field has a default.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EngineConfig {
    /// Directory of project plugin manifests
    #[serde(default)]
    pub project_dir: Option<PathBuf>,
    /// Directory of composite plugin manifests
    #[serde(default)]
    pub composite_dir: Option<PathBuf>,
    /// Root of per-user application data
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
    /// Overrides `<storage_path>/custom_indicators`
    #[serde(default)]
    pub custom_dir_override: Option<PathBuf>,
    /// Keep at most this many of the most recent bars per call
    #[serde(default)]
    pub max_bars_per_call: Option<usize>,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_storage_path() -> PathBuf {
    std::env::var_os("HOME")
        .map_or_else(|| PathBuf::from("."), PathBuf::from)
        .join(".marketmetrics")
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            project_dir: None,
            composite_dir: None,
            storage_path: default_storage_path(),
            custom_dir_override: None,
            max_bars_per_call: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parses a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Json`] for malformed input and
    /// [`CoreError::Config`] when a field holds an unusable value.
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] when the file cannot be read, otherwise
    /// the errors of [`EngineConfig::from_json_str`].
    pub fn from_json_file(path: &Path) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Checks field values that serde cannot.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] on an empty storage path or a zero bar cap.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.storage_path.as_os_str().is_empty() {
            return Err(CoreError::Config("storage_path is empty".to_string()));
        }
        if self.max_bars_per_call == Some(0) {
            return Err(CoreError::Config(
                "max_bars_per_call must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Directory holding user-authored indicator manifests.
    #[must_use]
    pub fn custom_dir(&self) -> PathBuf {
        self.custom_dir_override
            .clone()
            .unwrap_or_else(|| self.storage_path.join("custom_indicators"))
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Colourised output
    #[serde(default = "default_ansi")]
    pub ansi: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_ansi() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            ansi: default_ansi(),
        }
    }
}
