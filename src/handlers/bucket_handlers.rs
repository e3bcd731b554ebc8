//! Bucket-level handlers.
//!
//! A single `/{bucket}` path serves the bucket itself and its
//! sub-resources; the query-string selector (`?cors`, `?notification`,
//! `?location`, `?metadata`) picks the operation.

use super::{decode_body, reject};
use crate::{
    auth::Owner,
    errors::AppError,
    models::{cors::CorsConfig, notification::NotificationConfig},
    state::AppState,
};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, warn};

/// Names served by root-level routes. A bucket with one of these names could
/// be created but never read back over HTTP.
pub const RESERVED_BUCKET_NAMES: &[&str] = &["healthz", "readyz"];

/// Sub-resource selectors. Only presence matters, the values are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct SubresourceQuery {
    pub cors: Option<String>,
    pub notification: Option<String>,
    pub location: Option<String>,
    pub metadata: Option<String>,
}

/// `GET /` — names of the caller's buckets.
pub async fn list_buckets(
    State(state): State<AppState>,
    Owner(owner): Owner,
) -> Result<impl IntoResponse, AppError> {
    let names = state
        .buckets
        .list_buckets(&owner)
        .await
        .map_err(|e| reject("list_buckets", &owner, e))?;
    Ok(Json(names))
}

/// `PUT /{bucket}` — create the bucket, or replace one of its sub-resources.
pub async fn put_bucket(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(bucket): Path<String>,
    Query(query): Query<SubresourceQuery>,
    body: Bytes,
) -> Result<Response, AppError> {
    if query.cors.is_some() {
        let cors: CorsConfig = decode_body("put_bucket_cors", &bucket, &body)?;
        state
            .subresources
            .put_bucket_cors(&owner, &bucket, &cors)
            .await
            .map_err(|e| reject("put_bucket_cors", &bucket, e))?;
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    if query.notification.is_some() {
        let config: NotificationConfig = decode_body("put_bucket_notification", &bucket, &body)?;
        state
            .subresources
            .put_bucket_notification(&owner, &bucket, &config)
            .await
            .map_err(|e| reject("put_bucket_notification", &bucket, e))?;
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    if RESERVED_BUCKET_NAMES.contains(&bucket.as_str()) {
        warn!(bucket = %bucket, owner = %owner, "bucket name is reserved");
        return Err(AppError::bad_request());
    }
    let record = state
        .buckets
        .create_bucket(&owner, &bucket)
        .await
        .map_err(|e| reject("create_bucket", &bucket, e))?;
    debug!(bucket = %record.name, owner = %record.owner_id, "bucket created over http");
    Ok((StatusCode::OK, Json(record)).into_response())
}

/// `GET /{bucket}` with one sub-resource selector.
pub async fn get_bucket(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(bucket): Path<String>,
    Query(query): Query<SubresourceQuery>,
) -> Result<Response, AppError> {
    if query.location.is_some() {
        let location = state
            .buckets
            .get_bucket_location(&owner, &bucket)
            .await
            .map_err(|e| reject("get_bucket_location", &bucket, e))?;
        return Ok(Json(location).into_response());
    }
    if query.cors.is_some() {
        let cors = state
            .subresources
            .get_bucket_cors(&owner, &bucket)
            .await
            .map_err(|e| reject("get_bucket_cors", &bucket, e))?;
        return Ok(Json(cors).into_response());
    }
    if query.notification.is_some() {
        let config = state
            .subresources
            .get_bucket_notification(&owner, &bucket)
            .await
            .map_err(|e| reject("get_bucket_notification", &bucket, e))?;
        return Ok(Json(config).into_response());
    }
    if query.metadata.is_some() {
        let record = state
            .buckets
            .get_bucket_metadata(&owner, &bucket)
            .await
            .map_err(|e| reject("get_bucket_metadata", &bucket, e))?;
        return Ok(Json(record).into_response());
    }

    // object listing lives in the data plane
    Err(AppError::new(StatusCode::NOT_IMPLEMENTED, "not implemented"))
}

/// `DELETE /{bucket}` — delete the bucket, or only one of its sub-resources.
pub async fn delete_bucket(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(bucket): Path<String>,
    Query(query): Query<SubresourceQuery>,
) -> Result<StatusCode, AppError> {
    if query.cors.is_some() {
        state
            .subresources
            .delete_bucket_cors(&owner, &bucket)
            .await
            .map_err(|e| reject("delete_bucket_cors", &bucket, e))?;
    } else if query.notification.is_some() {
        state
            .subresources
            .delete_bucket_notification(&owner, &bucket)
            .await
            .map_err(|e| reject("delete_bucket_notification", &bucket, e))?;
    } else {
        state
            .buckets
            .delete_bucket(&owner, &bucket)
            .await
            .map_err(|e| reject("delete_bucket", &bucket, e))?;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// `HEAD /{bucket}` — existence and ownership, status only.
pub async fn head_bucket(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(bucket): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .buckets
        .head_bucket(&owner, &bucket)
        .await
        .map_err(|e| reject("head_bucket", &bucket, e))?;
    Ok(StatusCode::OK)
}
