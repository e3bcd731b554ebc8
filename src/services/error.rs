use super::{keyspace::KeyError, kv_store::StoreError};
use thiserror::Error;

/// Coarse classification surfaced to callers of the metadata layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    NoAccess,
    InvalidConfig,
    Internal,
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("bucket `{0}` not found")]
    BucketNotFound(String),
    #[error("bucket `{0}` already exists")]
    BucketAlreadyExists(String),
    #[error("notification target `{0}` not found")]
    TargetNotFound(String),
    #[error("no access")]
    NoAccess,
    #[error("invalid CORS config: {0}")]
    InvalidCorsConfig(String),
    #[error("invalid notification config: {0}")]
    InvalidNotificationConfig(String),
    #[error("invalid notification target config: {0}")]
    InvalidTargetConfig(String),
    #[error(transparent)]
    InvalidKey(#[from] KeyError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MetadataError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MetadataError::BucketNotFound(_) | MetadataError::TargetNotFound(_) => {
                ErrorKind::NotFound
            }
            MetadataError::BucketAlreadyExists(_) => ErrorKind::AlreadyExists,
            MetadataError::NoAccess => ErrorKind::NoAccess,
            MetadataError::InvalidCorsConfig(_)
            | MetadataError::InvalidNotificationConfig(_)
            | MetadataError::InvalidTargetConfig(_)
            | MetadataError::InvalidKey(_) => ErrorKind::InvalidConfig,
            MetadataError::Store(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn is_conflict(&self) -> bool {
        matches!(self, MetadataError::Store(StoreError::Conflict))
    }
}

pub type MetadataResult<T> = Result<T, MetadataError>;
