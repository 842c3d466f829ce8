use gridfile_storage::{
    copy_object, create_folder, delete_by_prefix, upload, EncryptionSettings, FsStore,
    InMemoryStore, ObjectLocation, ObjectStore, PutOptions, StorageError,
};
use tempfile::tempdir;

fn kms(key: &str) -> EncryptionSettings {
    EncryptionSettings::new("aws:kms").with_key_id(key)
}

fn store() -> InMemoryStore {
    InMemoryStore::new()
        .with_bucket("src", Some("acct"), Some(kms("src-key")))
        .with_bucket("dest", Some("acct"), Some(kms("dest-key")))
        .with_bucket("plain", None, None)
}

#[test]
fn test_upload_requires_bucket_encryption() {
    let store = store();
    let err = upload(
        &store,
        &ObjectLocation::new("plain", "a.csv"),
        Vec::new(),
        None,
        None,
    )
    .unwrap_err();
    assert!(matches!(err, StorageError::EncryptionNotConfigured { .. }));
    assert!(err.is_configuration());
}

#[test]
fn test_create_folder_adds_trailing_slash() {
    let store = store();
    let location = create_folder(&store, "src", "exports/2024", Some("acct")).unwrap();
    assert_eq!(location.key, "exports/2024/");
    let stored = store.object(&location).unwrap();
    assert!(stored.bytes.is_empty());
    assert_eq!(stored.encryption, Some(kms("src-key")));
}

#[test]
fn test_copy_object_keeps_content_type_and_uses_destination_key() {
    let store = store();
    let from = ObjectLocation::new("src", "report.xlsx");
    store
        .put(
            &from,
            b"bytes".to_vec(),
            &PutOptions::default().with_content_type("application/vnd.ms-excel"),
        )
        .unwrap();

    let to = ObjectLocation::new("dest", "copies/report.xlsx");
    copy_object(&store, &from, &to, Some("acct")).unwrap();

    let copied = store.object(&to).unwrap();
    assert_eq!(copied.bytes, b"bytes");
    assert_eq!(copied.content_type.as_deref(), Some("application/vnd.ms-excel"));
    assert_eq!(copied.encryption, Some(kms("dest-key")));
}

#[test]
fn test_delete_by_prefix_on_empty_listing_returns_none() {
    let store = store();
    assert_eq!(delete_by_prefix(&store, "src", "nothing/").unwrap(), None);

    for key in ["tmp/1", "tmp/2", "keep/3"] {
        store
            .put(&ObjectLocation::new("src", key), Vec::new(), &PutOptions::default())
            .unwrap();
    }
    assert_eq!(delete_by_prefix(&store, "src", "tmp/").unwrap(), Some(2));
    assert_eq!(store.list("src", "").unwrap(), vec!["keep/3"]);
}

#[test]
fn test_fs_store_folder_markers_list_as_folders() {
    let dir = tempdir().unwrap();
    std::fs::create_dir(dir.path().join("docs")).unwrap();
    let store = FsStore::new(dir.path()).with_default_encryption("docs", kms("fs-key"));

    create_folder(&store, "docs", "empty", None).unwrap();
    upload(
        &store,
        &ObjectLocation::new("docs", "empty/file.txt"),
        b"hi".to_vec(),
        Some("text/plain"),
        None,
    )
    .unwrap();

    assert_eq!(
        store.list("docs", "empty/").unwrap(),
        vec!["empty/", "empty/file.txt"]
    );
}
