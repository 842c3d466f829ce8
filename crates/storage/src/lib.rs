//! # gridfile-storage
//!
//! Interfaces to the services gridfile reads documents from and writes
//! documents to: an [`ObjectStore`] addressed by bucket and key, and a
//! [`SecretStore`] holding JSON secrets.
//!
//! Encryption settings are opaque to this crate. Writers fetch the bucket's
//! default once per write and hand it back to the store unchanged.
//!
//! ```
//! use gridfile_storage::{upload, EncryptionSettings, InMemoryStore, ObjectLocation, ObjectStore};
//!
//! let store = InMemoryStore::new().with_bucket(
//!     "reports",
//!     None,
//!     Some(EncryptionSettings::new("aws:kms").with_key_id("alias/reports")),
//! );
//! let location = ObjectLocation::new("reports", "daily/summary.csv");
//! upload(&store, &location, b"a,b\n1,2\n".to_vec(), Some("text/csv"), None).unwrap();
//!
//! let stored = store.object(&location).unwrap();
//! assert_eq!(stored.encryption.unwrap().algorithm, "aws:kms");
//! assert_eq!(store.get_bytes(&location, None).unwrap(), b"a,b\n1,2\n");
//! ```

pub mod error;
pub mod fs;
pub mod helpers;
pub mod memory;
pub mod secrets;
pub mod store;

pub use error::{Result, StorageError};
pub use fs::FsStore;
pub use helpers::{
    copy_object, create_folder, delete_by_prefix, document_name, sanitize_document_name, upload,
};
pub use memory::{InMemoryStore, StoredObject};
pub use secrets::{secret_value, EnvSecrets, SecretStore, StaticSecrets};
pub use store::{required_encryption, EncryptionSettings, ObjectLocation, ObjectStore, PutOptions};
