//! Bucket metadata control plane: buckets, their CORS and notification
//! sub-resources, and per-owner notification targets, kept in an embedded
//! transactional key-value store and served over HTTP.

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use state::AppState;

/// The complete HTTP application over `state`.
pub fn app(state: AppState) -> Router {
    routes::routes::routes().with_state(state)
}
