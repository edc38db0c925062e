use rocket::response::{Responder, Response};
use rocket::{Request, http::Status};
use std::io::Cursor;
use thiserror::Error;

/// Errors raised by the registry core (resolution, synthesis, storage).
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// Lock contention. Callers may retry the same request.
    #[error("resource is locked: {0}")]
    LockTimeout(String),

    #[error("unprocessable: {0}")]
    Unprocessable(String),

    #[error("invalid version: {0}")]
    InvalidVersion(String),

    #[error("unsupported range operator: {0}")]
    UnsupportedOperator(String),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::Error),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RegistryError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, RegistryError::LockTimeout(_))
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Locked(String),
    Unprocessable(String),
    /// Package is blocked; the body carries the reason.
    Blocked(String),
    InternalServerError(String),
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> rocket::response::Result<'static> {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (Status::BadRequest, msg),
            ApiError::NotFound(msg) => (Status::NotFound, msg),
            ApiError::Conflict(msg) => (Status::Conflict, msg),
            ApiError::Locked(msg) => (Status::Conflict, format!("{msg}, please retry")),
            ApiError::Unprocessable(msg) => (Status::UnprocessableEntity, msg),
            ApiError::Blocked(reason) => (Status::UnavailableForLegalReasons, reason),
            ApiError::InternalServerError(msg) => (Status::InternalServerError, msg),
        };

        Response::build()
            .status(status)
            .header(rocket::http::ContentType::Plain)
            .sized_body(message.len(), Cursor::new(message))
            .ok()
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(msg) => ApiError::NotFound(msg),
            RegistryError::Conflict(msg) => ApiError::Conflict(msg),
            RegistryError::LockTimeout(msg) => ApiError::Locked(msg),
            RegistryError::Unprocessable(msg) => ApiError::Unprocessable(msg),
            other => ApiError::InternalServerError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_lock_timeout_is_retryable() {
        assert!(RegistryError::LockTimeout("pkg".to_string()).is_retryable());
        assert!(!RegistryError::Conflict("pkg@1.0.0".to_string()).is_retryable());
        assert!(!RegistryError::NotFound("pkg".to_string()).is_retryable());
    }

    #[test]
    fn test_registry_error_maps_to_api_error() {
        match ApiError::from(RegistryError::NotFound("foo".to_string())) {
            ApiError::NotFound(msg) => assert_eq!(msg, "foo"),
            other => panic!("unexpected mapping: {other:?}"),
        }
        match ApiError::from(RegistryError::LockTimeout("k".to_string())) {
            ApiError::Locked(_) => {}
            other => panic!("unexpected mapping: {other:?}"),
        }
        match ApiError::from(RegistryError::InvalidVersion("x".to_string())) {
            ApiError::InternalServerError(msg) => assert!(msg.contains("invalid version")),
            other => panic!("unexpected mapping: {other:?}"),
        }
    }
}
