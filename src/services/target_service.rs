//! src/services/target_service.rs
//!
//! TargetService — per-owner registry of notification targets, stored under
//! `target/<owner_id>/<target_id>`. Puts are upserts; deletes are idempotent
//! and do not look for notification rules still naming the target.

use super::{
    MetadataError, MetadataResult,
    keyspace::{self, EntityKey},
    kv_store::{KvStore, ReadTxn, decode_json},
    with_conflict_retry,
};
use crate::models::target::{RABBITMQ_TARGET_TYPE, TargetRecord};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct TargetService {
    store: Arc<KvStore>,
}

impl TargetService {
    pub fn new(store: Arc<KvStore>) -> Self {
        Self { store }
    }

    /// Create or replace `target` in the caller's namespace.
    ///
    /// Returns InvalidTargetConfig for incomplete or unsupported targets and
    /// NoAccess when the record names a different owner.
    pub async fn put_target(&self, owner_id: &str, target: &TargetRecord) -> MetadataResult<()> {
        ensure_target_valid(target)?;
        if target.owner_id != owner_id {
            return Err(MetadataError::NoAccess);
        }
        with_conflict_retry("put_target", move || self.try_put(owner_id, target)).await?;

        debug!(owner = %owner_id, target_id = %target.id, "notification target stored");
        Ok(())
    }

    async fn try_put(&self, owner_id: &str, target: &TargetRecord) -> MetadataResult<()> {
        let key = EntityKey::target(owner_id, &target.id)?.encode();
        let mut txn = self.store.write().await?;
        txn.put_json(&key, target).await?;
        txn.commit().await?;
        Ok(())
    }

    pub async fn get_target(&self, owner_id: &str, target_id: &str) -> MetadataResult<TargetRecord> {
        let key = EntityKey::target(owner_id, target_id)?.encode();
        let mut txn = self.store.read().await?;
        let mut target: TargetRecord = txn
            .get_json(&key)
            .await?
            .ok_or_else(|| MetadataError::TargetNotFound(target_id.to_string()))?;
        target.owner_id = owner_id.to_string();
        Ok(target)
    }

    /// Remove a target. Absent targets are not an error.
    pub async fn delete_target(&self, owner_id: &str, target_id: &str) -> MetadataResult<()> {
        let removed =
            with_conflict_retry("delete_target", move || self.try_delete(owner_id, target_id))
                .await?;

        debug!(owner = %owner_id, target_id = %target_id, removed, "notification target deleted");
        Ok(())
    }

    async fn try_delete(&self, owner_id: &str, target_id: &str) -> MetadataResult<bool> {
        let key = EntityKey::target(owner_id, target_id)?.encode();
        let mut txn = self.store.write().await?;
        let removed = txn.delete(&key).await?;
        txn.commit().await?;
        Ok(removed)
    }

    /// Every target of `owner_id`, ordered by id.
    pub async fn list_targets(&self, owner_id: &str) -> MetadataResult<Vec<TargetRecord>> {
        let prefix = keyspace::target_prefix(owner_id)?;
        let mut txn = self.store.read().await?;

        let mut targets = Vec::new();
        for (key, value) in txn.scan_prefix(&prefix).await? {
            let Some(EntityKey::Target {
                owner_id,
                target_id,
            }) = EntityKey::decode(&key)
            else {
                continue;
            };
            let mut target: TargetRecord = decode_json(&key, &value)?;
            // the key is authoritative for identity
            target.owner_id = owner_id;
            target.id = target_id;
            targets.push(target);
        }
        Ok(targets)
    }

    pub async fn target_exists(&self, owner_id: &str, target_id: &str) -> MetadataResult<bool> {
        let mut txn = self.store.read().await?;
        target_exists_in(&mut txn, owner_id, target_id).await
    }
}

/// Existence probe against an already open transaction, so the answer
/// matches what that transaction will commit against.
pub(crate) async fn target_exists_in(
    txn: &mut ReadTxn,
    owner_id: &str,
    target_id: &str,
) -> MetadataResult<bool> {
    let key = EntityKey::target(owner_id, target_id)?.encode();
    Ok(txn.contains(&key).await?)
}

fn ensure_target_valid(target: &TargetRecord) -> MetadataResult<()> {
    let missing = [
        ("id", &target.id),
        ("url", &target.url),
        ("exchange", &target.exchange),
    ]
    .into_iter()
    .find(|(_, value)| value.is_empty());

    if let Some((field, _)) = missing {
        return Err(MetadataError::InvalidTargetConfig(format!(
            "{field} is required"
        )));
    }
    if target.target_type != RABBITMQ_TARGET_TYPE {
        return Err(MetadataError::InvalidTargetConfig(format!(
            "unsupported target type `{}`",
            target.target_type
        )));
    }
    Ok(())
}
