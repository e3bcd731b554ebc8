//! Notification delivery targets registered by an owner.

use serde::{Deserialize, Serialize};

/// The only delivery transport currently accepted.
pub const RABBITMQ_TARGET_TYPE: &str = "rabbitmq";

/// A broker destination that bucket notification rules can point at.
///
/// Targets are scoped to their owner: `id` is unique per owner, and the
/// owner itself is carried by the storage key rather than the document.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct TargetRecord {
    /// Identifier, unique within the owner's targets.
    pub id: String,

    /// Owning identity. Filled in from the key on read.
    #[serde(skip)]
    pub owner_id: String,

    /// Transport kind, e.g. `rabbitmq`.
    #[serde(rename = "type")]
    pub target_type: String,

    /// Broker URL, e.g. `amqp://broker:5672`.
    pub url: String,

    pub exchange: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_key: Option<String>,

    #[serde(default)]
    pub durable: bool,

    #[serde(default)]
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn owner_is_not_part_of_the_document() {
        let target = TargetRecord {
            id: "t1".into(),
            owner_id: "alice".into(),
            target_type: RABBITMQ_TARGET_TYPE.into(),
            url: "amqp://x".into(),
            exchange: "ex".into(),
            routing_key: None,
            durable: true,
            enabled: false,
        };
        assert_eq!(
            serde_json::to_value(&target).unwrap(),
            json!({
                "id": "t1",
                "type": "rabbitmq",
                "url": "amqp://x",
                "exchange": "ex",
                "durable": true,
                "enabled": false
            })
        );
    }
}
