use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::sync::{Mutex, MutexGuard};

use crate::error::{Result, StorageError};
use crate::store::{EncryptionSettings, ObjectLocation, ObjectStore, PutOptions};

/// An object as held by [`InMemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub encryption: Option<EncryptionSettings>,
}

#[derive(Debug, Default)]
struct Bucket {
    owner: Option<String>,
    default_encryption: Option<EncryptionSettings>,
    objects: BTreeMap<String, StoredObject>,
}

/// Process-local object store. Buckets must be declared before use.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    buckets: Mutex<BTreeMap<String, Bucket>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a bucket with an owner and default encryption.
    #[must_use]
    pub fn with_bucket(
        self,
        name: impl Into<String>,
        owner: Option<&str>,
        default_encryption: Option<EncryptionSettings>,
    ) -> Self {
        self.lock().insert(
            name.into(),
            Bucket {
                owner: owner.map(str::to_string),
                default_encryption,
                objects: BTreeMap::new(),
            },
        );
        self
    }

    /// Snapshot of a stored object, metadata included.
    #[must_use]
    pub fn object(&self, location: &ObjectLocation) -> Option<StoredObject> {
        self.lock()
            .get(&location.bucket)
            .and_then(|bucket| bucket.objects.get(&location.key))
            .cloned()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Bucket>> {
        self.buckets
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn bucket<'a>(
    buckets: &'a BTreeMap<String, Bucket>,
    name: &str,
) -> Result<&'a Bucket> {
    buckets.get(name).ok_or_else(|| StorageError::BucketNotFound {
        bucket: name.to_string(),
    })
}

fn check_owner(bucket: &Bucket, location: &ObjectLocation, expected: Option<&str>) -> Result<()> {
    match (expected, bucket.owner.as_deref()) {
        (Some(expected), Some(owner)) if expected != owner => Err(StorageError::OwnerMismatch {
            location: location.clone(),
            expected_owner: expected.to_string(),
        }),
        _ => Ok(()),
    }
}

impl ObjectStore for InMemoryStore {
    fn get(
        &self,
        location: &ObjectLocation,
        expected_owner: Option<&str>,
    ) -> Result<Box<dyn Read + Send>> {
        let buckets = self.lock();
        let bucket = bucket(&buckets, &location.bucket)?;
        check_owner(bucket, location, expected_owner)?;
        let object = bucket
            .objects
            .get(&location.key)
            .ok_or_else(|| StorageError::NotFound {
                location: location.clone(),
            })?;
        Ok(Box::new(Cursor::new(object.bytes.clone())))
    }

    fn put(&self, location: &ObjectLocation, bytes: Vec<u8>, options: &PutOptions) -> Result<()> {
        let mut buckets = self.lock();
        let target = buckets
            .get_mut(&location.bucket)
            .ok_or_else(|| StorageError::BucketNotFound {
                bucket: location.bucket.clone(),
            })?;
        check_owner(target, location, options.expected_owner.as_deref())?;
        tracing::debug!(%location, size = bytes.len(), "put object");
        target.objects.insert(
            location.key.clone(),
            StoredObject {
                bytes,
                content_type: options.content_type.clone(),
                encryption: options.encryption.clone(),
            },
        );
        Ok(())
    }

    fn copy(&self, from: &ObjectLocation, to: &ObjectLocation, options: &PutOptions) -> Result<()> {
        let bytes = {
            let buckets = self.lock();
            let source = bucket(&buckets, &from.bucket)?;
            source
                .objects
                .get(&from.key)
                .map(|object| object.bytes.clone())
                .ok_or_else(|| StorageError::NotFound {
                    location: from.clone(),
                })?
        };
        self.put(to, bytes, options)
    }

    fn list(&self, bucket_name: &str, prefix: &str) -> Result<Vec<String>> {
        let buckets = self.lock();
        let bucket = bucket(&buckets, bucket_name)?;
        Ok(bucket
            .objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn delete(&self, bucket_name: &str, keys: &[String]) -> Result<usize> {
        let mut buckets = self.lock();
        let bucket = buckets
            .get_mut(bucket_name)
            .ok_or_else(|| StorageError::BucketNotFound {
                bucket: bucket_name.to_string(),
            })?;
        Ok(keys
            .iter()
            .filter(|key| bucket.objects.remove(key.as_str()).is_some())
            .count())
    }

    fn content_type(&self, location: &ObjectLocation) -> Result<Option<String>> {
        let buckets = self.lock();
        let bucket = bucket(&buckets, &location.bucket)?;
        bucket
            .objects
            .get(&location.key)
            .map(|object| object.content_type.clone())
            .ok_or_else(|| StorageError::NotFound {
                location: location.clone(),
            })
    }

    fn default_encryption(&self, bucket_name: &str) -> Result<Option<EncryptionSettings>> {
        let buckets = self.lock();
        Ok(bucket(&buckets, bucket_name)?.default_encryption.clone())
    }
}
