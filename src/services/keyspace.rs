//! Typed key builder for the flat metadata key space.
//!
//! Layout:
//! - `bucket/<name>`                 — bucket record
//! - `bucket/<name>/cors`            — bucket CORS configuration
//! - `bucket/<name>/notification`    — bucket notification configuration
//! - `target/<owner_id>/<target_id>` — notification target record
//!
//! Segments never contain the separator, so every logical key maps to exactly
//! one string and a `bucket/` scan can tell records apart from sub-resources
//! by depth alone.

use thiserror::Error;

pub const SEPARATOR: char = '/';

const BUCKET_ROOT: &str = "bucket/";
const TARGET_ROOT: &str = "target/";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("{field} must not be empty")]
    EmptySegment { field: &'static str },
    #[error("{field} `{value}` must not contain `/`")]
    SeparatorInSegment { field: &'static str, value: String },
}

/// Configuration documents attached to a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subresource {
    Cors,
    Notification,
}

impl Subresource {
    pub fn as_str(self) -> &'static str {
        match self {
            Subresource::Cors => "cors",
            Subresource::Notification => "notification",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "cors" => Some(Subresource::Cors),
            "notification" => Some(Subresource::Notification),
            _ => None,
        }
    }
}

/// A logical entity path in the metadata store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Bucket {
        name: String,
    },
    BucketSubresource {
        name: String,
        kind: Subresource,
    },
    Target {
        owner_id: String,
        target_id: String,
    },
}

impl EntityKey {
    pub fn bucket(name: &str) -> Result<Self, KeyError> {
        check_segment("bucket name", name)?;
        Ok(EntityKey::Bucket {
            name: name.to_string(),
        })
    }

    pub fn subresource(name: &str, kind: Subresource) -> Result<Self, KeyError> {
        check_segment("bucket name", name)?;
        Ok(EntityKey::BucketSubresource {
            name: name.to_string(),
            kind,
        })
    }

    pub fn cors(name: &str) -> Result<Self, KeyError> {
        Self::subresource(name, Subresource::Cors)
    }

    pub fn notification(name: &str) -> Result<Self, KeyError> {
        Self::subresource(name, Subresource::Notification)
    }

    pub fn target(owner_id: &str, target_id: &str) -> Result<Self, KeyError> {
        check_segment("owner id", owner_id)?;
        check_segment("target id", target_id)?;
        Ok(EntityKey::Target {
            owner_id: owner_id.to_string(),
            target_id: target_id.to_string(),
        })
    }

    /// Flatten into the stored key string.
    pub fn encode(&self) -> String {
        match self {
            EntityKey::Bucket { name } => format!("{BUCKET_ROOT}{name}"),
            EntityKey::BucketSubresource { name, kind } => {
                format!("{BUCKET_ROOT}{name}{SEPARATOR}{}", kind.as_str())
            }
            EntityKey::Target {
                owner_id,
                target_id,
            } => format!("{TARGET_ROOT}{owner_id}{SEPARATOR}{target_id}"),
        }
    }

    /// Parse a stored key back into its logical path.
    ///
    /// Returns `None` for anything outside the layout, including keys with
    /// extra depth or unknown sub-resource names.
    pub fn decode(raw: &str) -> Option<Self> {
        if let Some(rest) = raw.strip_prefix(BUCKET_ROOT) {
            let mut parts = rest.split(SEPARATOR);
            let name = parts.next().filter(|n| !n.is_empty())?;
            return match (parts.next(), parts.next()) {
                (None, _) => Some(EntityKey::Bucket {
                    name: name.to_string(),
                }),
                (Some(kind), None) => Some(EntityKey::BucketSubresource {
                    name: name.to_string(),
                    kind: Subresource::parse(kind)?,
                }),
                _ => None,
            };
        }

        if let Some(rest) = raw.strip_prefix(TARGET_ROOT) {
            let (owner_id, target_id) = rest.split_once(SEPARATOR)?;
            if owner_id.is_empty() || target_id.is_empty() || target_id.contains(SEPARATOR) {
                return None;
            }
            return Some(EntityKey::Target {
                owner_id: owner_id.to_string(),
                target_id: target_id.to_string(),
            });
        }

        None
    }
}

/// Prefix shared by every bucket record and sub-resource key.
pub fn bucket_root() -> &'static str {
    BUCKET_ROOT
}

/// Prefix of every sub-resource key belonging to bucket `name`.
///
/// Ends with the separator so that `photos` never matches `photos2/...`.
pub fn subresource_prefix(name: &str) -> Result<String, KeyError> {
    check_segment("bucket name", name)?;
    Ok(format!("{BUCKET_ROOT}{name}{SEPARATOR}"))
}

/// Prefix of every target key owned by `owner_id`.
pub fn target_prefix(owner_id: &str) -> Result<String, KeyError> {
    check_segment("owner id", owner_id)?;
    Ok(format!("{TARGET_ROOT}{owner_id}{SEPARATOR}"))
}

fn check_segment(field: &'static str, value: &str) -> Result<(), KeyError> {
    if value.is_empty() {
        return Err(KeyError::EmptySegment { field });
    }
    if value.contains(SEPARATOR) {
        return Err(KeyError::SeparatorInSegment {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}
