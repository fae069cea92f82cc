//! Error types for the registry
//!
//! Every fallible operation in the crate returns [`RegistryError`]. The variants mirror
//! the status codes surfaced to API callers, so transports only need [`RegistryError::code`]
//! to pick a response code.

use thiserror::Error;

/// Main error type for registry operations
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Malformed input from the caller (bad name, page size, view, filter, token)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Referenced resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Create collided with an existing resource
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// No analyzer is registered for a spec style
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Serialization, decoding or store corruption
    #[error("Internal error: {0}")]
    Internal(String),

    /// Store could not be reached
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Transport-neutral status code for an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidArgument,
    NotFound,
    AlreadyExists,
    Unsupported,
    Internal,
    Unavailable,
}

impl RegistryError {
    /// Status code reported to API callers
    pub fn code(&self) -> ErrorCode {
        match self {
            RegistryError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            RegistryError::NotFound(_) => ErrorCode::NotFound,
            RegistryError::AlreadyExists(_) => ErrorCode::AlreadyExists,
            RegistryError::Unsupported(_) => ErrorCode::Unsupported,
            RegistryError::Unavailable(_) => ErrorCode::Unavailable,
            RegistryError::Internal(_)
            | RegistryError::Database(_)
            | RegistryError::Config(_)
            | RegistryError::Io(_)
            | RegistryError::Serialization(_) => ErrorCode::Internal,
        }
    }

    /// True when the error means "resource absent"
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound(_))
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        RegistryError::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        RegistryError::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        RegistryError::Internal(msg.into())
    }
}

impl From<libsql::Error> for RegistryError {
    fn from(err: libsql::Error) -> Self {
        RegistryError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RegistryError::NotFound("projects/demo".to_string());
        assert_eq!(err.to_string(), "Not found: projects/demo");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            RegistryError::invalid("bad page size").code(),
            ErrorCode::InvalidArgument
        );
        assert_eq!(
            RegistryError::AlreadyExists("x".into()).code(),
            ErrorCode::AlreadyExists
        );
        assert_eq!(
            RegistryError::Database("locked".into()).code(),
            ErrorCode::Internal
        );
        assert!(RegistryError::not_found("x").is_not_found());
        assert!(!RegistryError::internal("x").is_not_found());
    }

    #[test]
    fn test_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json");
        let err: RegistryError = json_err.unwrap_err().into();
        assert!(matches!(err, RegistryError::Serialization(_)));
        assert_eq!(err.code(), ErrorCode::Internal);
    }
}
