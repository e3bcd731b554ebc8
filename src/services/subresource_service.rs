//! src/services/subresource_service.rs
//!
//! SubresourceService — CORS and notification documents attached to a
//! bucket. Each call checks bucket existence and ownership in the same
//! transaction that reads or writes the sub-resource key.

use super::{
    MetadataError, MetadataResult,
    bucket_service::load_owned_bucket,
    keyspace::{EntityKey, Subresource},
    kv_store::KvStore,
    notification_validator::validate_notification_config,
    with_conflict_retry,
};
use crate::models::{cors::CorsConfig, notification::NotificationConfig};
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct SubresourceService {
    store: Arc<KvStore>,
}

impl SubresourceService {
    pub fn new(store: Arc<KvStore>) -> Self {
        Self { store }
    }

    /// Stored CORS config, or an empty one if none was ever set.
    pub async fn get_bucket_cors(&self, owner_id: &str, name: &str) -> MetadataResult<CorsConfig> {
        self.read_document(owner_id, name, Subresource::Cors).await
    }

    /// Replace the bucket's CORS config.
    pub async fn put_bucket_cors(
        &self,
        owner_id: &str,
        name: &str,
        cors: &CorsConfig,
    ) -> MetadataResult<()> {
        if let Some(field) = cors.blank_entry() {
            return Err(MetadataError::InvalidCorsConfig(format!(
                "{field} contains a blank entry"
            )));
        }
        with_conflict_retry("put_bucket_cors", move || {
            self.write_document(owner_id, name, Subresource::Cors, cors)
        })
        .await?;

        debug!(bucket = %name, owner = %owner_id, "bucket CORS stored");
        Ok(())
    }

    /// Remove the bucket's CORS config. Removing an absent config succeeds.
    pub async fn delete_bucket_cors(&self, owner_id: &str, name: &str) -> MetadataResult<()> {
        with_conflict_retry("delete_bucket_cors", move || {
            self.delete_document(owner_id, name, Subresource::Cors)
        })
        .await
    }

    /// Stored notification config, or an empty rule list if none was set.
    pub async fn get_bucket_notification(
        &self,
        owner_id: &str,
        name: &str,
    ) -> MetadataResult<NotificationConfig> {
        self.read_document(owner_id, name, Subresource::Notification)
            .await
    }

    /// Validate and replace the bucket's notification config.
    ///
    /// Every rule must name one of the owner's targets and only supported
    /// events. Any failing rule rejects the whole config and leaves the
    /// previous one in place.
    pub async fn put_bucket_notification(
        &self,
        owner_id: &str,
        name: &str,
        config: &NotificationConfig,
    ) -> MetadataResult<()> {
        with_conflict_retry("put_bucket_notification", move || {
            self.try_put_notification(owner_id, name, config)
        })
        .await?;

        debug!(
            bucket = %name,
            owner = %owner_id,
            rules = config.rules.len(),
            "bucket notification stored"
        );
        Ok(())
    }

    async fn try_put_notification(
        &self,
        owner_id: &str,
        name: &str,
        config: &NotificationConfig,
    ) -> MetadataResult<()> {
        let key = EntityKey::notification(name)?.encode();
        let mut txn = self.store.write().await?;
        let bucket = load_owned_bucket(&mut txn, owner_id, name).await?;
        // rules may only reference the bucket owner's targets
        validate_notification_config(&mut txn, &bucket.owner_id, config).await?;
        txn.put_json(&key, config).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Remove the bucket's notification config. Removing an absent config succeeds.
    pub async fn delete_bucket_notification(
        &self,
        owner_id: &str,
        name: &str,
    ) -> MetadataResult<()> {
        with_conflict_retry("delete_bucket_notification", move || {
            self.delete_document(owner_id, name, Subresource::Notification)
        })
        .await
    }

    async fn read_document<T>(
        &self,
        owner_id: &str,
        name: &str,
        kind: Subresource,
    ) -> MetadataResult<T>
    where
        T: DeserializeOwned + Default,
    {
        let key = EntityKey::subresource(name, kind)?.encode();
        let mut txn = self.store.read().await?;
        load_owned_bucket(&mut txn, owner_id, name).await?;
        Ok(txn.get_json(&key).await?.unwrap_or_default())
    }

    async fn write_document<T: Serialize>(
        &self,
        owner_id: &str,
        name: &str,
        kind: Subresource,
        document: &T,
    ) -> MetadataResult<()> {
        let key = EntityKey::subresource(name, kind)?.encode();
        let mut txn = self.store.write().await?;
        load_owned_bucket(&mut txn, owner_id, name).await?;
        txn.put_json(&key, document).await?;
        txn.commit().await?;
        Ok(())
    }

    async fn delete_document(
        &self,
        owner_id: &str,
        name: &str,
        kind: Subresource,
    ) -> MetadataResult<()> {
        let key = EntityKey::subresource(name, kind)?.encode();
        let mut txn = self.store.write().await?;
        load_owned_bucket(&mut txn, owner_id, name).await?;
        let removed = txn.delete(&key).await?;
        txn.commit().await?;

        debug!(
            bucket = %name,
            owner = %owner_id,
            subresource = kind.as_str(),
            removed,
            "bucket sub-resource deleted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        notification::{EventType, NotificationRule},
        target::TargetRecord,
    };
    use crate::services::{
        ErrorKind, bucket_service::BucketService, target_service::TargetService,
        test_support::temp_store,
    };

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<KvStore>,
        buckets: BucketService,
        subresources: SubresourceService,
        targets: TargetService,
    }

    async fn fixture() -> Fixture {
        let (dir, store) = temp_store().await;
        let fixture = Fixture {
            _dir: dir,
            buckets: BucketService::new(store.clone()),
            subresources: SubresourceService::new(store.clone()),
            targets: TargetService::new(store.clone()),
            store,
        };
        fixture.buckets.create_bucket("alice", "photos").await.unwrap();
        fixture
    }

    fn sample_cors() -> CorsConfig {
        CorsConfig {
            allowed_origins: vec!["https://example.com".into()],
            allowed_methods: vec!["GET".into(), "PUT".into()],
            allowed_headers: vec!["Authorization".into()],
            expose_headers: vec!["ETag".into()],
        }
    }

    fn rule(target_id: &str, events: Vec<EventType>) -> NotificationRule {
        NotificationRule {
            id: Some("r1".into()),
            target_id: target_id.into(),
            events,
            prefix: Some("raw/".into()),
            suffix: None,
        }
    }

    async fn put_target(targets: &TargetService, owner: &str, id: &str) {
        let target = TargetRecord {
            id: id.into(),
            owner_id: owner.into(),
            target_type: "rabbitmq".into(),
            url: "amqp://x".into(),
            exchange: "ex".into(),
            routing_key: None,
            durable: false,
            enabled: true,
        };
        targets.put_target(owner, &target).await.unwrap();
    }

    #[tokio::test]
    async fn cors_defaults_to_empty() {
        let f = fixture().await;
        let cors = f.subresources.get_bucket_cors("alice", "photos").await.unwrap();
        assert_eq!(cors, CorsConfig::default());
    }

    #[tokio::test]
    async fn cors_round_trips() {
        let f = fixture().await;
        f.subresources
            .put_bucket_cors("alice", "photos", &sample_cors())
            .await
            .unwrap();
        assert_eq!(
            f.subresources.get_bucket_cors("alice", "photos").await.unwrap(),
            sample_cors()
        );
    }

    #[tokio::test]
    async fn cors_delete_is_idempotent() {
        let f = fixture().await;
        f.subresources.delete_bucket_cors("alice", "photos").await.unwrap();

        f.subresources
            .put_bucket_cors("alice", "photos", &sample_cors())
            .await
            .unwrap();
        f.subresources.delete_bucket_cors("alice", "photos").await.unwrap();
        f.subresources.delete_bucket_cors("alice", "photos").await.unwrap();
        assert_eq!(
            f.subresources.get_bucket_cors("alice", "photos").await.unwrap(),
            CorsConfig::default()
        );
    }

    #[tokio::test]
    async fn blank_cors_entries_are_rejected() {
        let f = fixture().await;
        let cors = CorsConfig {
            allowed_origins: vec![String::new()],
            ..Default::default()
        };
        let err = f
            .subresources
            .put_bucket_cors("alice", "photos", &cors)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    }

    #[tokio::test]
    async fn subresources_are_gated_on_bucket_ownership() {
        let f = fixture().await;

        let errors = [
            f.subresources.get_bucket_cors("bob", "photos").await.unwrap_err(),
            f.subresources
                .put_bucket_cors("bob", "photos", &sample_cors())
                .await
                .unwrap_err(),
            f.subresources.delete_bucket_cors("bob", "photos").await.unwrap_err(),
            f.subresources
                .get_bucket_notification("bob", "photos")
                .await
                .unwrap_err(),
            f.subresources
                .put_bucket_notification("bob", "photos", &NotificationConfig::default())
                .await
                .unwrap_err(),
        ];
        for err in errors {
            assert_eq!(err.kind(), ErrorKind::NoAccess);
        }

        let err = f
            .subresources
            .get_bucket_cors("alice", "missing")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn bucket_delete_removes_subresources() {
        let f = fixture().await;
        put_target(&f.targets, "alice", "t1").await;
        f.subresources
            .put_bucket_cors("alice", "photos", &sample_cors())
            .await
            .unwrap();
        let config = NotificationConfig {
            rules: vec![rule("t1", vec![EventType::ObjectCreatedPut])],
        };
        f.subresources
            .put_bucket_notification("alice", "photos", &config)
            .await
            .unwrap();

        f.buckets.delete_bucket("alice", "photos").await.unwrap();

        let cors_err = f.subresources.get_bucket_cors("alice", "photos").await.unwrap_err();
        let notif_err = f
            .subresources
            .get_bucket_notification("alice", "photos")
            .await
            .unwrap_err();
        assert_eq!(cors_err.kind(), ErrorKind::NotFound);
        assert_eq!(notif_err.kind(), ErrorKind::NotFound);

        // a recreated bucket starts without the old configuration
        f.buckets.create_bucket("alice", "photos").await.unwrap();
        assert_eq!(
            f.subresources.get_bucket_cors("alice", "photos").await.unwrap(),
            CorsConfig::default()
        );
        assert!(
            f.subresources
                .get_bucket_notification("alice", "photos")
                .await
                .unwrap()
                .rules
                .is_empty()
        );
    }

    #[tokio::test]
    async fn notification_defaults_to_no_rules() {
        let f = fixture().await;
        let cfg = f
            .subresources
            .get_bucket_notification("alice", "photos")
            .await
            .unwrap();
        assert!(cfg.rules.is_empty());
    }

    #[tokio::test]
    async fn unknown_target_rejects_and_keeps_previous_config() {
        let f = fixture().await;
        put_target(&f.targets, "alice", "t1").await;
        put_target(&f.targets, "bob", "t2").await;

        let good = NotificationConfig {
            rules: vec![rule("t1", vec![EventType::ObjectCreatedPut])],
        };
        f.subresources
            .put_bucket_notification("alice", "photos", &good)
            .await
            .unwrap();

        for bad_target in ["missing", "t2"] {
            let bad = NotificationConfig {
                rules: vec![
                    rule("t1", vec![EventType::ObjectRemovedDelete]),
                    rule(bad_target, vec![EventType::ObjectCreatedPut]),
                ],
            };
            let err = f
                .subresources
                .put_bucket_notification("alice", "photos", &bad)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidConfig);
        }

        assert_eq!(
            f.subresources
                .get_bucket_notification("alice", "photos")
                .await
                .unwrap(),
            good
        );
    }

    #[tokio::test]
    async fn rejected_first_put_leaves_config_absent() {
        let f = fixture().await;
        let bad = NotificationConfig {
            rules: vec![rule("t1", vec![EventType::Unsupported])],
        };
        let err = f
            .subresources
            .put_bucket_notification("alice", "photos", &bad)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
        assert!(
            f.subresources
                .get_bucket_notification("alice", "photos")
                .await
                .unwrap()
                .rules
                .is_empty()
        );
    }

    #[tokio::test]
    async fn deleted_target_leaves_dangling_rule() {
        let f = fixture().await;
        put_target(&f.targets, "alice", "t1").await;
        let config = NotificationConfig {
            rules: vec![rule("t1", vec![EventType::ObjectCreatedPut])],
        };
        f.subresources
            .put_bucket_notification("alice", "photos", &config)
            .await
            .unwrap();

        f.targets.delete_target("alice", "t1").await.unwrap();

        let stored = f
            .subresources
            .get_bucket_notification("alice", "photos")
            .await
            .unwrap();
        assert_eq!(stored, config);
    }

    #[tokio::test]
    async fn notification_delete_is_idempotent() {
        let f = fixture().await;
        put_target(&f.targets, "alice", "t1").await;
        let config = NotificationConfig {
            rules: vec![rule("t1", vec![EventType::ObjectCreatedPut])],
        };
        f.subresources
            .put_bucket_notification("alice", "photos", &config)
            .await
            .unwrap();

        f.subresources
            .delete_bucket_notification("alice", "photos")
            .await
            .unwrap();
        f.subresources
            .delete_bucket_notification("alice", "photos")
            .await
            .unwrap();
        assert!(
            f.subresources
                .get_bucket_notification("alice", "photos")
                .await
                .unwrap()
                .rules
                .is_empty()
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn notification_put_waits_for_an_uncommitted_target_delete() {
        let f = fixture().await;
        put_target(&f.targets, "alice", "t1").await;

        let mut deleting = f.store.write().await.unwrap();
        let key = EntityKey::target("alice", "t1").unwrap().encode();
        assert!(deleting.delete(&key).await.unwrap());

        let subresources = f.subresources.clone();
        let put = tokio::spawn(async move {
            let config = NotificationConfig {
                rules: vec![rule("t1", vec![EventType::ObjectCreatedPut])],
            };
            subresources
                .put_bucket_notification("alice", "photos", &config)
                .await
        });

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        deleting.commit().await.unwrap();

        let err = put.await.unwrap().unwrap_err();
        assert!(matches!(err, MetadataError::InvalidNotificationConfig(_)));
        assert!(
            f.subresources
                .get_bucket_notification("alice", "photos")
                .await
                .unwrap()
                .rules
                .is_empty()
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn notification_put_racing_target_delete_is_serialized() {
        let f = fixture().await;

        for round in 0..8 {
            put_target(&f.targets, "alice", "t1").await;
            f.subresources
                .delete_bucket_notification("alice", "photos")
                .await
                .unwrap();

            let subresources = f.subresources.clone();
            let put = tokio::spawn(async move {
                let config = NotificationConfig {
                    rules: vec![rule("t1", vec![EventType::ObjectRemovedDelete])],
                };
                subresources
                    .put_bucket_notification("alice", "photos", &config)
                    .await
            });
            let targets = f.targets.clone();
            let delete = tokio::spawn(async move { targets.delete_target("alice", "t1").await });

            delete.await.unwrap().unwrap();
            let stored = f
                .subresources
                .get_bucket_notification("alice", "photos")
                .await
                .unwrap();
            match put.await.unwrap() {
                // committed while t1 still existed; the rule may dangle afterwards
                Ok(()) => assert_eq!(stored.rules.len(), 1, "round {round}"),
                Err(err) => {
                    assert_eq!(err.kind(), ErrorKind::InvalidConfig, "round {round}");
                    assert!(stored.rules.is_empty(), "round {round}");
                }
            }
        }
    }
}
