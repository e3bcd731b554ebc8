//! Represents a logical bucket — a named, owned container for configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A storage bucket in the metadata store.
///
/// Bucket names are globally unique across owners. The record is written once
/// on create and never mutated; deleting the bucket removes it together with
/// every sub-resource stored beneath it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BucketRecord {
    /// Globally unique bucket name.
    pub name: String,

    /// Identity of the owner that created this bucket.
    pub owner_id: String,

    /// When this bucket was created.
    pub created_at: DateTime<Utc>,
}

/// Response body of `GetBucketLocation`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BucketLocation {
    pub location: String,
}

impl BucketLocation {
    /// Every bucket lives on the local node.
    pub fn local() -> Self {
        Self {
            location: "local".into(),
        }
    }
}
