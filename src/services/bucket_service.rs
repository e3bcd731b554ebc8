//! src/services/bucket_service.rs
//!
//! BucketService — bucket lifecycle and ownership checks. Names are global
//! and first-come-first-served; every read or mutation of a bucket checks
//! that the caller owns it, inside the same transaction as the operation.

use super::{
    MetadataError, MetadataResult,
    keyspace::{self, EntityKey},
    kv_store::{KvStore, ReadTxn, decode_json},
    with_conflict_retry,
};
use crate::models::bucket::{BucketLocation, BucketRecord};
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct BucketService {
    store: Arc<KvStore>,
}

impl BucketService {
    pub fn new(store: Arc<KvStore>) -> Self {
        Self { store }
    }

    /// Create a bucket owned by `owner_id`.
    ///
    /// Returns BucketAlreadyExists if any owner already holds the name.
    pub async fn create_bucket(&self, owner_id: &str, name: &str) -> MetadataResult<BucketRecord> {
        with_conflict_retry("create_bucket", move || self.try_create(owner_id, name)).await
    }

    async fn try_create(&self, owner_id: &str, name: &str) -> MetadataResult<BucketRecord> {
        let key = EntityKey::bucket(name)?.encode();
        let mut txn = self.store.write().await?;
        if txn.contains(&key).await? {
            return Err(MetadataError::BucketAlreadyExists(name.to_string()));
        }

        let record = BucketRecord {
            name: name.to_string(),
            owner_id: owner_id.to_string(),
            created_at: Utc::now(),
        };
        txn.put_json(&key, &record).await?;
        txn.commit().await?;

        debug!(bucket = %name, owner = %owner_id, "bucket created");
        Ok(record)
    }

    /// Fetch the bucket record if the caller owns it.
    pub async fn get_bucket_metadata(
        &self,
        owner_id: &str,
        name: &str,
    ) -> MetadataResult<BucketRecord> {
        let mut txn = self.store.read().await?;
        load_owned_bucket(&mut txn, owner_id, name).await
    }

    /// Names of every bucket owned by `owner_id`, in key order.
    pub async fn list_buckets(&self, owner_id: &str) -> MetadataResult<Vec<String>> {
        let mut txn = self.store.read().await?;
        let mut names = Vec::new();

        for (key, value) in txn.scan_prefix(keyspace::bucket_root()).await? {
            // sub-resources share the prefix
            let Some(EntityKey::Bucket { name }) = EntityKey::decode(&key) else {
                continue;
            };
            let record: BucketRecord = decode_json(&key, &value)?;
            if record.owner_id == owner_id {
                names.push(name);
            }
        }

        Ok(names)
    }

    /// Delete a bucket and every sub-resource stored under it, atomically.
    pub async fn delete_bucket(&self, owner_id: &str, name: &str) -> MetadataResult<()> {
        with_conflict_retry("delete_bucket", move || self.try_delete(owner_id, name)).await
    }

    async fn try_delete(&self, owner_id: &str, name: &str) -> MetadataResult<()> {
        let key = EntityKey::bucket(name)?.encode();
        let prefix = keyspace::subresource_prefix(name)?;

        let mut txn = self.store.write().await?;
        load_owned_bucket(&mut txn, owner_id, name).await?;
        txn.delete(&key).await?;
        let removed = txn.delete_prefix(&prefix).await?;
        txn.commit().await?;

        debug!(bucket = %name, owner = %owner_id, subresources = removed, "bucket deleted");
        Ok(())
    }

    /// Existence and ownership check without a body.
    pub async fn head_bucket(&self, owner_id: &str, name: &str) -> MetadataResult<()> {
        let mut txn = self.store.read().await?;
        load_owned_bucket(&mut txn, owner_id, name).await?;
        Ok(())
    }

    pub async fn get_bucket_location(
        &self,
        owner_id: &str,
        name: &str,
    ) -> MetadataResult<BucketLocation> {
        self.head_bucket(owner_id, name).await?;
        Ok(BucketLocation::local())
    }
}

/// Load bucket `name` within `txn` and verify `owner_id` owns it.
///
/// Shared by every operation that gates on the bucket, so the check runs in
/// the same transaction as whatever follows it.
pub(crate) async fn load_owned_bucket(
    txn: &mut ReadTxn,
    owner_id: &str,
    name: &str,
) -> MetadataResult<BucketRecord> {
    let key = EntityKey::bucket(name)?.encode();
    let record: BucketRecord = txn
        .get_json(&key)
        .await?
        .ok_or_else(|| MetadataError::BucketNotFound(name.to_string()))?;

    if record.owner_id != owner_id {
        return Err(MetadataError::NoAccess);
    }
    Ok(record)
}
