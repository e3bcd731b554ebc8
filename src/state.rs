use crate::{
    auth::OwnerResolver,
    services::{
        bucket_service::BucketService, kv_store::KvStore, subresource_service::SubresourceService,
        target_service::TargetService,
    },
};
use axum::extract::FromRef;
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<KvStore>,
    pub buckets: BucketService,
    pub subresources: SubresourceService,
    pub targets: TargetService,
    pub owners: Arc<dyn OwnerResolver>,
}

impl AppState {
    pub fn new(store: Arc<KvStore>, owners: Arc<dyn OwnerResolver>) -> Self {
        Self {
            buckets: BucketService::new(store.clone()),
            subresources: SubresourceService::new(store.clone()),
            targets: TargetService::new(store.clone()),
            store,
            owners,
        }
    }
}

impl FromRef<AppState> for Arc<dyn OwnerResolver> {
    fn from_ref(state: &AppState) -> Self {
        state.owners.clone()
    }
}
