//! Defines routes for the bucket metadata API.
//!
//! ## Structure
//! - **Bucket-level endpoints**
//!   - `GET    /` — list the caller's buckets
//!   - `PUT    /{bucket}` — create bucket (`?cors`, `?notification` replace a sub-resource)
//!   - `GET    /{bucket}` — `?location`, `?cors`, `?notification` or `?metadata`
//!   - `DELETE /{bucket}` — delete bucket (`?cors`, `?notification` delete a sub-resource)
//!   - `HEAD   /{bucket}` — existence and ownership
//!
//! - **Notification targets**
//!   - `GET    /doss/v1/targets`
//!   - `GET | PUT | DELETE /doss/v1/targets/{target_id}`

use crate::{
    handlers::{
        bucket_handlers::{delete_bucket, get_bucket, head_bucket, list_buckets, put_bucket},
        health_handlers::{healthz, readyz},
        target_handlers::{delete_target, get_target, list_targets, put_target},
    },
    state::AppState,
};
use axum::{Router, routing::get};

/// Build the router. State is supplied by the caller with `with_state`.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Target registry
        .route("/doss/v1/targets", get(list_targets))
        .route(
            "/doss/v1/targets/{target_id}",
            get(get_target).put(put_target).delete(delete_target),
        )
        // Bucket-level routes
        .route("/", get(list_buckets))
        .route(
            "/{bucket}",
            get(get_bucket)
                .put(put_bucket)
                .delete(delete_bucket)
                .head(head_bucket),
        )
}
