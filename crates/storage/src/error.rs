use thiserror::Error;

use crate::ObjectLocation;

/// Errors raised by object stores and secret stores
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Object not found: {location}")]
    NotFound { location: ObjectLocation },

    #[error("Bucket not found: {bucket}")]
    BucketNotFound { bucket: String },

    #[error("Access denied to {location}: bucket is not owned by {expected_owner}")]
    OwnerMismatch {
        location: ObjectLocation,
        expected_owner: String,
    },

    #[error("Invalid object key: {key:?}")]
    InvalidKey { key: String },

    #[error("No default encryption configured for bucket {bucket}")]
    EncryptionNotConfigured { bucket: String },

    #[error("IO error at {location}: {source}")]
    Io {
        location: ObjectLocation,
        #[source]
        source: std::io::Error,
    },

    #[error("Secret {name} has no value")]
    SecretMissing { name: String },

    #[error("Secret {name} has no key {key}")]
    SecretKeyMissing { name: String, key: String },

    #[error("Secret {name} is not a JSON object: {source}")]
    SecretFormat {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    /// Whether the fault is missing configuration rather than a transport
    /// or lookup failure.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            StorageError::EncryptionNotConfigured { .. }
                | StorageError::SecretMissing { .. }
                | StorageError::SecretKeyMissing { .. }
                | StorageError::SecretFormat { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
