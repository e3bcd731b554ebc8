//! HTTP handlers. Each one authenticates the caller, decodes the request
//! strictly, and delegates to the metadata services.

pub mod bucket_handlers;
pub mod health_handlers;
pub mod target_handlers;

use crate::{
    errors::AppError,
    services::{ErrorKind, MetadataError},
};
use axum::body::Bytes;
use serde::de::DeserializeOwned;
use tracing::{error, warn};

/// Log the full domain error, then reduce it to the constant client message.
pub(crate) fn reject(op: &'static str, resource: &str, err: MetadataError) -> AppError {
    match err.kind() {
        ErrorKind::Internal => error!(op, resource, error = %err, "metadata operation failed"),
        kind => warn!(op, resource, ?kind, error = %err, "metadata operation rejected"),
    }
    err.into()
}

/// Decode a JSON body, rejecting unknown fields and malformed input with 400.
pub(crate) fn decode_body<T: DeserializeOwned>(
    op: &'static str,
    resource: &str,
    body: &Bytes,
) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|err| {
        warn!(op, resource, error = %err, "malformed request body");
        AppError::bad_request()
    })
}
