//! Engine error types.

use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};

use mm_indicators::IndicatorError;
use mm_types::CoreError;
use thiserror::Error;

/// Errors raised while serving one engine call.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No plugin with this id is registered
    #[error("unknown indicator: {0}")]
    UnknownIndicator(String),

    /// Store or configuration failure
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Indicator construction or computation failed
    #[error(transparent)]
    Indicator(#[from] IndicatorError),

    /// Indicator code panicked
    #[error("indicator '{id}' panicked: {message}")]
    Panicked {
        /// Indicator id
        id: String,
        /// Panic payload rendered as text
        message: String,
    },
}

/// A plugin unit that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryError {
    /// Path of the offending unit (or directory)
    pub path: PathBuf,
    /// Human readable cause
    pub reason: String,
}

impl DiscoveryError {
    /// Creates a discovery error for `path`.
    #[must_use]
    pub fn new(path: &Path, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}

impl std::error::Error for DiscoveryError {}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_error_display() {
        let err = DiscoveryError::new(Path::new("/plugins/broken.json"), "expected value");
        assert_eq!(err.to_string(), "/plugins/broken.json: expected value");
    }

    #[test]
    fn test_panic_message_variants() {
        let payload = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload = std::panic::catch_unwind(|| panic!("{} {}", "formatted", 1)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "formatted 1");
    }

    #[test]
    fn test_engine_error_wraps_indicator_error() {
        let err: EngineError = IndicatorError::invalid_params("window").into();
        assert_eq!(err.to_string(), "invalid parameters: window");
    }
}
