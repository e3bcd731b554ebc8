use crate::services::{ErrorKind, MetadataError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight HTTP error carrying a status and a constant message.
///
/// Domain errors are converted here so that no storage detail reaches the
/// client; the full error is logged by the handler before conversion.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad request")
    }

    /// Shortcut for 401 Unauthorized
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized")
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<MetadataError> for AppError {
    fn from(err: MetadataError) -> Self {
        match (&err, err.kind()) {
            (MetadataError::TargetNotFound(_), _) => {
                AppError::new(StatusCode::NOT_FOUND, "target not found")
            }
            (_, ErrorKind::NotFound) => AppError::new(StatusCode::NOT_FOUND, "bucket not found"),
            (_, ErrorKind::AlreadyExists) => {
                AppError::new(StatusCode::CONFLICT, "bucket already exists")
            }
            (_, ErrorKind::NoAccess) => AppError::new(StatusCode::FORBIDDEN, "forbidden"),
            (_, ErrorKind::InvalidConfig) => AppError::bad_request(),
            (_, ErrorKind::Internal) => AppError::internal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::kv_store::StoreError;

    #[test]
    fn domain_errors_map_to_constant_messages() {
        let cases = [
            (
                MetadataError::BucketNotFound("photos".into()),
                StatusCode::NOT_FOUND,
                "bucket not found",
            ),
            (
                MetadataError::TargetNotFound("t1".into()),
                StatusCode::NOT_FOUND,
                "target not found",
            ),
            (
                MetadataError::BucketAlreadyExists("photos".into()),
                StatusCode::CONFLICT,
                "bucket already exists",
            ),
            (MetadataError::NoAccess, StatusCode::FORBIDDEN, "forbidden"),
            (
                MetadataError::InvalidNotificationConfig("rule 0: target `x` does not exist".into()),
                StatusCode::BAD_REQUEST,
                "bad request",
            ),
            (
                MetadataError::Store(StoreError::Conflict),
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error",
            ),
        ];

        for (err, status, message) in cases {
            let app = AppError::from(err);
            assert_eq!(app.status, status);
            assert_eq!(app.message, message);
        }
    }
}
