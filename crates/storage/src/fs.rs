use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use crate::error::{Result, StorageError};
use crate::store::{EncryptionSettings, ObjectLocation, ObjectStore, PutOptions};

/// Object store backed by a directory: `<root>/<bucket>/<key>`.
///
/// Encryption and ownership metadata are accepted and not persisted.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
    encryption: HashMap<String, EncryptionSettings>,
}

impl FsStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            encryption: HashMap::new(),
        }
    }

    /// Report `settings` as the default encryption of `bucket`.
    #[must_use]
    pub fn with_default_encryption(
        mut self,
        bucket: impl Into<String>,
        settings: EncryptionSettings,
    ) -> Self {
        self.encryption.insert(bucket.into(), settings);
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf> {
        if !is_plain_segment(bucket) {
            return Err(StorageError::InvalidKey {
                key: bucket.to_string(),
            });
        }
        Ok(self.root.join(bucket))
    }

    fn object_path(&self, location: &ObjectLocation) -> Result<PathBuf> {
        let relative = Path::new(&location.key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if location.key.is_empty() || escapes {
            return Err(StorageError::InvalidKey {
                key: location.key.clone(),
            });
        }
        let mut path = self.bucket_dir(&location.bucket)?.join(relative);
        // Folder markers ("a/b/") live as a directory with a marker file.
        if location.key.ends_with('/') {
            path.push(FOLDER_MARKER);
        }
        Ok(path)
    }

    fn io_error(location: &ObjectLocation, source: io::Error) -> StorageError {
        if source.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound {
                location: location.clone(),
            }
        } else {
            StorageError::Io {
                location: location.clone(),
                source,
            }
        }
    }

    fn require_bucket(&self, bucket: &str) -> Result<PathBuf> {
        let dir = self.bucket_dir(bucket)?;
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(StorageError::BucketNotFound {
                bucket: bucket.to_string(),
            })
        }
    }
}

const FOLDER_MARKER: &str = ".folder";

fn is_plain_segment(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && name != "." && name != ".."
}

fn collect_keys(dir: &Path, prefix: &str, out: &mut Vec<String>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type()?.is_dir() {
            collect_keys(&entry.path(), &format!("{prefix}{name}/"), out)?;
        } else if name == FOLDER_MARKER {
            out.push(prefix.to_string());
        } else {
            out.push(format!("{prefix}{name}"));
        }
    }
    Ok(())
}

impl ObjectStore for FsStore {
    fn get(
        &self,
        location: &ObjectLocation,
        _expected_owner: Option<&str>,
    ) -> Result<Box<dyn Read + Send>> {
        self.require_bucket(&location.bucket)?;
        let path = self.object_path(location)?;
        let file = fs::File::open(&path).map_err(|e| Self::io_error(location, e))?;
        Ok(Box::new(io::BufReader::new(file)))
    }

    fn put(&self, location: &ObjectLocation, bytes: Vec<u8>, _options: &PutOptions) -> Result<()> {
        self.require_bucket(&location.bucket)?;
        let path = self.object_path(location)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Self::io_error(location, e))?;
        }
        fs::write(&path, bytes).map_err(|e| Self::io_error(location, e))?;
        tracing::debug!(%location, path = %path.display(), "wrote object");
        Ok(())
    }

    fn copy(&self, from: &ObjectLocation, to: &ObjectLocation, options: &PutOptions) -> Result<()> {
        let bytes = self.get_bytes(from, None)?;
        self.put(to, bytes, options)
    }

    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let dir = self.require_bucket(bucket)?;
        let mut keys = Vec::new();
        collect_keys(&dir, "", &mut keys).map_err(|source| StorageError::Io {
            location: ObjectLocation::new(bucket, prefix),
            source,
        })?;
        keys.retain(|key| key.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }

    fn delete(&self, bucket: &str, keys: &[String]) -> Result<usize> {
        self.require_bucket(bucket)?;
        let mut removed = 0;
        for key in keys {
            let location = ObjectLocation::new(bucket, key.as_str());
            let path = self.object_path(&location)?;
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(Self::io_error(&location, e)),
            }
        }
        Ok(removed)
    }

    fn content_type(&self, location: &ObjectLocation) -> Result<Option<String>> {
        let path = self.object_path(location)?;
        if path.is_file() {
            Ok(None)
        } else {
            Err(StorageError::NotFound {
                location: location.clone(),
            })
        }
    }

    fn default_encryption(&self, bucket: &str) -> Result<Option<EncryptionSettings>> {
        self.require_bucket(bucket)?;
        Ok(self.encryption.get(bucket).cloned())
    }
}
