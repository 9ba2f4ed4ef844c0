//! Error types for apuntes.

use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

/// Common error type for drive operations.
#[derive(Error, Debug)]
pub enum DriveError {
    /// The object store could not be reached or rejected the request.
    ///
    /// Covers transport, authentication, rate-limit and timeout failures.
    /// Callers may retry after a backoff.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A caller-supplied prefix would leave the configured namespace root.
    #[error("invalid prefix: {0}")]
    InvalidPrefix(String),

    /// Recursive counting hit the configured depth ceiling.
    #[error("depth limit of {limit} exceeded under {prefix}")]
    DepthExceeded {
        /// Prefix whose walk was aborted.
        prefix: String,
        /// Configured ceiling.
        limit: usize,
    },

    /// The operation was cancelled before it completed.
    #[error("operation cancelled")]
    Cancelled,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for configuration or user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl DriveError {
    /// Serializable discriminant of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DriveError::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
            DriveError::InvalidPrefix(_) => ErrorKind::InvalidPrefix,
            DriveError::DepthExceeded { .. } => ErrorKind::DepthExceeded,
            DriveError::Cancelled => ErrorKind::Cancelled,
            DriveError::Io(_) | DriveError::Validation(_) | DriveError::Config(_) => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<StoreError> for DriveError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Cancelled => DriveError::Cancelled,
            e => DriveError::StoreUnavailable(e.to_string()),
        }
    }
}

/// Error discriminant carried in per-folder count results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    StoreUnavailable,
    InvalidPrefix,
    DepthExceeded,
    Cancelled,
    Internal,
}

/// Result type alias for drive operations.
pub type Result<T> = std::result::Result<T, DriveError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_store_unavailable_display() {
        let err = DriveError::StoreUnavailable("connection reset".to_string());
        assert_eq!(err.to_string(), "store unavailable: connection reset");
    }

    #[test]
    fn test_depth_exceeded_display() {
        let err = DriveError::DepthExceeded {
            prefix: "apuntes/".to_string(),
            limit: 4,
        };
        assert_eq!(err.to_string(), "depth limit of 4 exceeded under apuntes/");
    }

    #[test]
    fn test_store_error_conversion() {
        let err: DriveError = StoreError::Timeout(Duration::from_secs(3)).into();
        assert!(matches!(err, DriveError::StoreUnavailable(_)));
        assert!(err.to_string().contains("timed out"));

        let err: DriveError = StoreError::Cancelled.into();
        assert!(matches!(err, DriveError::Cancelled));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DriveError = io_err.into();
        assert!(matches!(err, DriveError::Io(_)));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            DriveError::StoreUnavailable("x".into()).kind(),
            ErrorKind::StoreUnavailable
        );
        assert_eq!(
            DriveError::InvalidPrefix("..".into()).kind(),
            ErrorKind::InvalidPrefix
        );
        assert_eq!(DriveError::Cancelled.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_error_kind_serialize() {
        let json = serde_json::to_string(&ErrorKind::StoreUnavailable).unwrap();
        assert_eq!(json, "\"STORE_UNAVAILABLE\"");
    }
}
