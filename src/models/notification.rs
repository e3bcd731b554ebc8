//! Event-notification configuration stored for a bucket.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Object events a notification rule can subscribe to.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventType {
    #[serde(rename = "s3:ObjectCreated:Put", alias = "object-created-put")]
    ObjectCreatedPut,
    #[serde(rename = "s3:ObjectRemoved:Delete", alias = "object-removed-delete")]
    ObjectRemovedDelete,
    /// Any event name outside the allow-list. Decodes successfully so the
    /// validator can reject it with a config error instead of a parse error.
    #[serde(other)]
    Unsupported,
}

impl EventType {
    pub fn is_supported(self) -> bool {
        !matches!(self, EventType::Unsupported)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EventType::ObjectCreatedPut => "s3:ObjectCreated:Put",
            EventType::ObjectRemovedDelete => "s3:ObjectRemoved:Delete",
            EventType::Unsupported => "unsupported",
        })
    }
}

/// Routes matching object events of a bucket to one of the owner's targets.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct NotificationRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Id of a target owned by the bucket owner.
    #[serde(default)]
    pub target_id: String,

    #[serde(default)]
    pub events: Vec<EventType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

/// The full notification document of a bucket.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct NotificationConfig {
    pub rules: Vec<NotificationRule>,
}
