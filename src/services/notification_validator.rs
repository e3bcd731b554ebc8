//! Referential and schema checks for bucket notification configs.
//!
//! Runs inside the caller's write transaction so that a target deleted
//! concurrently cannot slip between the check and the write.

use super::{MetadataError, MetadataResult, kv_store::ReadTxn, target_service::target_exists_in};
use crate::models::notification::{NotificationConfig, NotificationRule};
use std::collections::HashSet;

/// Check every rule of `config` against the allow-list and the targets of
/// `owner_id`. The first offending rule rejects the whole config.
pub async fn validate_notification_config(
    txn: &mut ReadTxn,
    owner_id: &str,
    config: &NotificationConfig,
) -> MetadataResult<()> {
    let mut known_targets: HashSet<&str> = HashSet::new();

    for (index, rule) in config.rules.iter().enumerate() {
        check_rule_shape(index, rule)?;

        if known_targets.contains(rule.target_id.as_str()) {
            continue;
        }
        if !target_exists_in(txn, owner_id, &rule.target_id).await? {
            return Err(MetadataError::InvalidNotificationConfig(format!(
                "rule {index}: target `{}` does not exist",
                rule.target_id
            )));
        }
        known_targets.insert(rule.target_id.as_str());
    }

    Ok(())
}

fn check_rule_shape(index: usize, rule: &NotificationRule) -> MetadataResult<()> {
    if rule.target_id.is_empty() {
        return Err(MetadataError::InvalidNotificationConfig(format!(
            "rule {index}: target_id is required"
        )));
    }
    if rule.events.is_empty() {
        return Err(MetadataError::InvalidNotificationConfig(format!(
            "rule {index}: at least one event is required"
        )));
    }
    if let Some(event) = rule.events.iter().find(|e| !e.is_supported()) {
        return Err(MetadataError::InvalidNotificationConfig(format!(
            "rule {index}: event {event} is not supported"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notification::EventType;
    use crate::services::{ErrorKind, test_support::temp_store};

    fn rule(target_id: &str, events: Vec<EventType>) -> NotificationRule {
        NotificationRule {
            id: None,
            target_id: target_id.into(),
            events,
            prefix: None,
            suffix: None,
        }
    }

    #[tokio::test]
    async fn empty_config_is_valid() {
        let (_dir, store) = temp_store().await;
        let mut txn = store.read().await.unwrap();
        validate_notification_config(&mut txn, "alice", &NotificationConfig::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn shape_errors_are_invalid_config() {
        let (_dir, store) = temp_store().await;
        let mut txn = store.write().await.unwrap();
        txn.put("target/alice/t1", b"{}").await.unwrap();

        let cases = [
            rule("", vec![EventType::ObjectCreatedPut]),
            rule("t1", vec![]),
            rule("t1", vec![EventType::ObjectCreatedPut, EventType::Unsupported]),
        ];
        for case in cases {
            let config = NotificationConfig { rules: vec![case] };
            let err = validate_notification_config(&mut txn, "alice", &config)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidConfig);
        }
    }

    #[tokio::test]
    async fn targets_must_belong_to_owner() {
        let (_dir, store) = temp_store().await;
        let mut txn = store.write().await.unwrap();
        txn.put("target/bob/t1", b"{}").await.unwrap();

        let config = NotificationConfig {
            rules: vec![rule("t1", vec![EventType::ObjectRemovedDelete])],
        };
        let err = validate_notification_config(&mut txn, "alice", &config)
            .await
            .unwrap_err();
        assert!(matches!(err, MetadataError::InvalidNotificationConfig(_)));

        validate_notification_config(&mut txn, "bob", &config)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn sees_targets_written_earlier_in_the_transaction() {
        let (_dir, store) = temp_store().await;
        let mut txn = store.write().await.unwrap();
        txn.put("target/alice/t1", b"{}").await.unwrap();
        txn.put("target/alice/t2", b"{}").await.unwrap();

        let config = NotificationConfig {
            rules: vec![
                rule("t1", vec![EventType::ObjectCreatedPut]),
                rule("t2", vec![EventType::ObjectRemovedDelete]),
                rule("t1", vec![EventType::ObjectRemovedDelete]),
            ],
        };
        validate_notification_config(&mut txn, "alice", &config)
            .await
            .unwrap();
    }
}
