//! Error types for the alert system.

use thiserror::Error;

/// Result type for alert operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the alert system.
#[derive(Debug, Error)]
pub enum Error {
    /// Alert unknown, or not in a state that allows the operation.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Notification channel is disabled.
    #[error("Channel disabled: {0}")]
    ChannelDisabled(String),

    /// Notification delivery failed.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Other error.
    #[error("Other: {0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Whether this error means "no such alert" to a caller.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = Error::NotFound("Alert alert_1 not found".to_string());
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Not found: Alert alert_1 not found");
    }

    #[test]
    fn test_other_is_not_not_found() {
        let err: Error = anyhow::anyhow!("boom").into();
        assert!(!err.is_not_found());
    }
}
