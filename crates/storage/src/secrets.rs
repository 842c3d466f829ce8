use std::collections::HashMap;

use crate::error::{Result, StorageError};

/// Lookup of secret strings by name.
pub trait SecretStore {
    /// The secret's string payload, or `None` when it has none.
    fn secret_string(&self, name: &str) -> Result<Option<String>>;
}

/// Fixed set of secrets held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticSecrets {
    secrets: HashMap<String, String>,
}

impl StaticSecrets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_secret(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), value.into());
        self
    }
}

impl SecretStore for StaticSecrets {
    fn secret_string(&self, name: &str) -> Result<Option<String>> {
        Ok(self.secrets.get(name).cloned())
    }
}

/// Secrets read from environment variables named after the secret.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecrets;

impl SecretStore for EnvSecrets {
    fn secret_string(&self, name: &str) -> Result<Option<String>> {
        Ok(std::env::var(name).ok())
    }
}

/// Fetch secret `name`, parse it as a JSON object and return the string at
/// `key`. Missing secrets and keys are configuration errors.
pub fn secret_value<S: SecretStore + ?Sized>(store: &S, name: &str, key: &str) -> Result<String> {
    let raw = store
        .secret_string(name)?
        .ok_or_else(|| StorageError::SecretMissing {
            name: name.to_string(),
        })?;

    let blob: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&raw).map_err(|source| StorageError::SecretFormat {
            name: name.to_string(),
            source,
        })?;

    let missing = || StorageError::SecretKeyMissing {
        name: name.to_string(),
        key: key.to_string(),
    };
    match blob.get(key).ok_or_else(missing)? {
        serde_json::Value::String(s) => Ok(s.clone()),
        serde_json::Value::Null => Err(missing()),
        other => Ok(other.to_string()),
    }
}
