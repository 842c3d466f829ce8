use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;

use crate::error::{Result, StorageError};

/// Bucket and key of a stored object. Displays as `bucket/key`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    #[must_use]
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Server-side encryption settings, passed through to the store unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionSettings {
    pub algorithm: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
}

impl EncryptionSettings {
    #[must_use]
    pub fn new(algorithm: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            key_id: None,
        }
    }

    #[must_use]
    pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = Some(key_id.into());
        self
    }
}

/// Metadata sent with a write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOptions {
    pub content_type: Option<String>,
    pub encryption: Option<EncryptionSettings>,
    /// Account the bucket must belong to for the write to proceed.
    pub expected_owner: Option<String>,
}

impl PutOptions {
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    #[must_use]
    pub fn with_encryption(mut self, encryption: EncryptionSettings) -> Self {
        self.encryption = Some(encryption);
        self
    }

    #[must_use]
    pub fn with_expected_owner(mut self, owner: Option<String>) -> Self {
        self.expected_owner = owner;
        self
    }
}

/// Blob storage addressed by bucket and key.
///
/// Every call is a single synchronous request; implementations own any
/// retry policy.
pub trait ObjectStore {
    /// Open an object for reading.
    fn get(
        &self,
        location: &ObjectLocation,
        expected_owner: Option<&str>,
    ) -> Result<Box<dyn Read + Send>>;

    fn put(&self, location: &ObjectLocation, bytes: Vec<u8>, options: &PutOptions) -> Result<()>;

    /// Server-side copy. `options` describes the destination object.
    fn copy(&self, from: &ObjectLocation, to: &ObjectLocation, options: &PutOptions) -> Result<()>;

    /// Keys in `bucket` starting with `prefix`, in lexical order.
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>>;

    /// Delete `keys` from `bucket`, returning how many were removed.
    fn delete(&self, bucket: &str, keys: &[String]) -> Result<usize>;

    /// Content type recorded for an object, if any.
    fn content_type(&self, location: &ObjectLocation) -> Result<Option<String>>;

    /// The bucket's configured default encryption.
    fn default_encryption(&self, bucket: &str) -> Result<Option<EncryptionSettings>>;

    /// Read a whole object into memory.
    fn get_bytes(&self, location: &ObjectLocation, expected_owner: Option<&str>) -> Result<Vec<u8>> {
        let mut reader = self.get(location, expected_owner)?;
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|source| StorageError::Io {
                location: location.clone(),
                source,
            })?;
        Ok(bytes)
    }
}

impl<S: ObjectStore + ?Sized> ObjectStore for &S {
    fn get(
        &self,
        location: &ObjectLocation,
        expected_owner: Option<&str>,
    ) -> Result<Box<dyn Read + Send>> {
        (**self).get(location, expected_owner)
    }

    fn put(&self, location: &ObjectLocation, bytes: Vec<u8>, options: &PutOptions) -> Result<()> {
        (**self).put(location, bytes, options)
    }

    fn copy(&self, from: &ObjectLocation, to: &ObjectLocation, options: &PutOptions) -> Result<()> {
        (**self).copy(from, to, options)
    }

    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        (**self).list(bucket, prefix)
    }

    fn delete(&self, bucket: &str, keys: &[String]) -> Result<usize> {
        (**self).delete(bucket, keys)
    }

    fn content_type(&self, location: &ObjectLocation) -> Result<Option<String>> {
        (**self).content_type(location)
    }

    fn default_encryption(&self, bucket: &str) -> Result<Option<EncryptionSettings>> {
        (**self).default_encryption(bucket)
    }
}

/// Fetch the bucket's default encryption; its absence is a configuration
/// error.
pub fn required_encryption<S: ObjectStore + ?Sized>(
    store: &S,
    bucket: &str,
) -> Result<EncryptionSettings> {
    store
        .default_encryption(bucket)?
        .ok_or_else(|| StorageError::EncryptionNotConfigured {
            bucket: bucket.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        assert_eq!(
            ObjectLocation::new("reports", "2024/q1.csv").to_string(),
            "reports/2024/q1.csv"
        );
    }

    #[test]
    fn test_encryption_settings_serde() {
        let settings: EncryptionSettings =
            serde_json::from_str(r#"{"algorithm":"aws:kms","key_id":"key-1"}"#).unwrap();
        assert_eq!(settings, EncryptionSettings::new("aws:kms").with_key_id("key-1"));

        let plain = serde_json::to_string(&EncryptionSettings::new("AES256")).unwrap();
        assert_eq!(plain, r#"{"algorithm":"AES256"}"#);
    }
}
