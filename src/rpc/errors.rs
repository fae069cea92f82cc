//! Error conversion from RegistryError to gRPC Status

use crate::error::{ErrorCode, RegistryError};
use tonic::{Code, Status};

impl From<RegistryError> for Status {
    fn from(err: RegistryError) -> Self {
        let code = match err.code() {
            ErrorCode::InvalidArgument => Code::InvalidArgument,
            ErrorCode::NotFound => Code::NotFound,
            ErrorCode::AlreadyExists => Code::AlreadyExists,
            ErrorCode::Unsupported => Code::FailedPrecondition,
            ErrorCode::Unavailable => Code::Unavailable,
            ErrorCode::Internal => Code::Internal,
        };
        Status::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let err = RegistryError::not_found("projects/p/apis/a");
        let status: Status = err.into();
        assert_eq!(status.code(), Code::NotFound);
        assert!(status.message().contains("projects/p/apis/a"));
    }

    #[test]
    fn test_unsupported_style() {
        let status: Status = RegistryError::Unsupported("style \"wsdl\"".into()).into();
        assert_eq!(status.code(), Code::FailedPrecondition);
    }

    #[test]
    fn test_ambient_errors_are_internal() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        let status: Status = RegistryError::from(io).into();
        assert_eq!(status.code(), Code::Internal);

        let status: Status = RegistryError::Database("locked".into()).into();
        assert_eq!(status.code(), Code::Internal);
    }
}
