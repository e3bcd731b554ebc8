//! Notification target handlers under `/doss/v1/targets`.

use super::{decode_body, reject};
use crate::{auth::Owner, errors::AppError, models::target::TargetRecord, state::AppState};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::warn;

/// Body of `PUT /doss/v1/targets/{target_id}`.
///
/// The owner never comes from the body, and `id` is optional because the
/// path already names the target.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PutTargetRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub target_type: String,
    pub url: String,
    pub exchange: String,
    #[serde(default)]
    pub routing_key: Option<String>,
    #[serde(default)]
    pub durable: bool,
    #[serde(default)]
    pub enabled: bool,
}

impl PutTargetRequest {
    fn into_record(self, owner_id: String, target_id: String) -> TargetRecord {
        TargetRecord {
            id: target_id,
            owner_id,
            target_type: self.target_type,
            url: self.url,
            exchange: self.exchange,
            routing_key: self.routing_key,
            durable: self.durable,
            enabled: self.enabled,
        }
    }
}

/// `GET /doss/v1/targets`
pub async fn list_targets(
    State(state): State<AppState>,
    Owner(owner): Owner,
) -> Result<impl IntoResponse, AppError> {
    let targets = state
        .targets
        .list_targets(&owner)
        .await
        .map_err(|e| reject("list_targets", &owner, e))?;
    Ok(Json(targets))
}

/// `GET /doss/v1/targets/{target_id}`
pub async fn get_target(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(target_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let target = state
        .targets
        .get_target(&owner, &target_id)
        .await
        .map_err(|e| reject("get_target", &target_id, e))?;
    Ok(Json(target))
}

/// `PUT /doss/v1/targets/{target_id}`
pub async fn put_target(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(target_id): Path<String>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let request: PutTargetRequest = decode_body("put_target", &target_id, &body)?;
    if let Some(body_id) = request.id.as_deref() {
        if body_id != target_id {
            warn!(target_id = %target_id, body_id, "target id in body does not match path");
            return Err(AppError::bad_request());
        }
    }

    let record = request.into_record(owner.clone(), target_id);
    state
        .targets
        .put_target(&owner, &record)
        .await
        .map_err(|e| reject("put_target", &record.id, e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /doss/v1/targets/{target_id}`
pub async fn delete_target(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(target_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .targets
        .delete_target(&owner, &target_id)
        .await
        .map_err(|e| reject("delete_target", &target_id, e))?;
    Ok(StatusCode::NO_CONTENT)
}
