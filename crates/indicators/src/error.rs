//! Indicator error types.

use thiserror::Error;

/// Errors that can occur during indicator construction, computation or
/// registry operations.
#[derive(Debug, Error)]
pub enum IndicatorError {
    /// Unknown kernel or indicator id requested from a registry
    #[error("unknown indicator: {0}")]
    UnknownIndicator(String),

    /// Invalid parameters for the indicator
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// Computation error (e.g. inconsistent input ordering)
    #[error("computation error: {0}")]
    ComputationError(String),

    /// Incremental state could not be encoded or decoded
    #[error("state encoding error: {0}")]
    StateEncoding(#[from] serde_json::Error),
}

impl IndicatorError {
    /// Creates an `InvalidParams` error with a message.
    #[must_use]
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        IndicatorError::InvalidParams(msg.into())
    }

    /// Creates a `ComputationError` with a message.
    #[must_use]
    pub fn computation(msg: impl Into<String>) -> Self {
        IndicatorError::ComputationError(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            IndicatorError::invalid_params("window must be numeric").to_string(),
            "invalid parameters: window must be numeric"
        );
        assert_eq!(
            IndicatorError::UnknownIndicator("nope".into()).to_string(),
            "unknown indicator: nope"
        );
    }
}
