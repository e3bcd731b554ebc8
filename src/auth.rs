//! Bearer-token owner resolution.
//!
//! Every request is attributed to an owner before it reaches a handler. The
//! mapping from token to owner sits behind [`OwnerResolver`] so deployments
//! can plug in a real identity provider.

use crate::errors::AppError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use std::{collections::HashMap, sync::Arc};
use tracing::debug;

/// Maps an opaque bearer token to the owner it authenticates.
pub trait OwnerResolver: Send + Sync {
    fn resolve(&self, token: &str) -> Option<String>;
}

/// Fixed token table, loaded from configuration at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticTokens {
    tokens: HashMap<String, String>,
}

impl StaticTokens {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl FromIterator<(String, String)> for StaticTokens {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl OwnerResolver for StaticTokens {
    fn resolve(&self, token: &str) -> Option<String> {
        self.tokens.get(token).cloned()
    }
}

/// Authenticated owner of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner(pub String);

impl<S> FromRequestParts<S> for Owner
where
    Arc<dyn OwnerResolver>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let resolver = Arc::<dyn OwnerResolver>::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(AppError::unauthorized)?;

        match resolver.resolve(token) {
            Some(owner) => Ok(Owner(owner)),
            None => {
                debug!(path = %parts.uri.path(), "rejected unknown bearer token");
                Err(AppError::unauthorized())
            }
        }
    }
}

fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
