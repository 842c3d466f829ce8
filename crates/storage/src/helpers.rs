//! Composite operations built on [`ObjectStore`].

use crate::error::Result;
use crate::store::{required_encryption, ObjectLocation, ObjectStore, PutOptions};

/// Write `bytes` with the bucket's default encryption.
///
/// The encryption is looked up once for this call; a bucket without one is
/// a configuration error.
pub fn upload<S: ObjectStore + ?Sized>(
    store: &S,
    location: &ObjectLocation,
    bytes: Vec<u8>,
    content_type: Option<&str>,
    expected_owner: Option<&str>,
) -> Result<()> {
    let encryption = required_encryption(store, &location.bucket)?;
    let mut options = PutOptions::default()
        .with_encryption(encryption)
        .with_expected_owner(expected_owner.map(str::to_string));
    if let Some(content_type) = content_type {
        options = options.with_content_type(content_type);
    }
    tracing::info!(%location, size = bytes.len(), "Uploading object");
    store.put(location, bytes, &options)
}

/// Create an empty "folder" object; a trailing `/` is added when missing.
pub fn create_folder<S: ObjectStore + ?Sized>(
    store: &S,
    bucket: &str,
    folder: &str,
    expected_owner: Option<&str>,
) -> Result<ObjectLocation> {
    let key = if folder.ends_with('/') {
        folder.to_string()
    } else {
        format!("{folder}/")
    };
    let location = ObjectLocation::new(bucket, key);
    upload(store, &location, Vec::new(), None, expected_owner)?;
    Ok(location)
}

/// Copy an object, keeping its content type and applying the destination
/// bucket's default encryption.
pub fn copy_object<S: ObjectStore + ?Sized>(
    store: &S,
    from: &ObjectLocation,
    to: &ObjectLocation,
    expected_owner: Option<&str>,
) -> Result<()> {
    let content_type = store.content_type(from)?;
    let encryption = required_encryption(store, &to.bucket)?;
    let mut options = PutOptions::default()
        .with_encryption(encryption)
        .with_expected_owner(expected_owner.map(str::to_string));
    if let Some(content_type) = content_type {
        options = options.with_content_type(content_type);
    }
    tracing::info!(%from, %to, "Copying object");
    store.copy(from, to, &options)
}

/// Delete every key under `prefix`.
///
/// Returns `None` without calling delete when nothing matches, otherwise
/// the number of objects removed.
pub fn delete_by_prefix<S: ObjectStore + ?Sized>(
    store: &S,
    bucket: &str,
    prefix: &str,
) -> Result<Option<usize>> {
    let keys = store.list(bucket, prefix)?;
    if keys.is_empty() {
        tracing::debug!(bucket, prefix, "No objects to delete");
        return Ok(None);
    }
    let removed = store.delete(bucket, &keys)?;
    tracing::info!(bucket, prefix, removed, "Deleted objects by prefix");
    Ok(Some(removed))
}

/// Document file name for a key: its last path segment plus `.pdf`.
#[must_use]
pub fn document_name(key: &str) -> String {
    let last = key
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    format!("{last}.pdf")
}

/// Keep ASCII letters, digits, `-` and whitespace; collapse whitespace runs to a
/// single space.
#[must_use]
pub fn sanitize_document_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || c.is_ascii_whitespace())
        .collect();
    let mut out = String::with_capacity(kept.len());
    let mut in_space = false;
    for c in kept.chars() {
        if c.is_ascii_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}
