use std::{
    collections::HashMap,
    io,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use keyset_codec::Format;
use keyset_core::{EncryptedKeyset, WriteError};
use thiserror::Error;
use tracing::{info, instrument, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors produced by secret store backends.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecretStoreError {
    /// Backend refused the request (permissions, quota).
    #[error("secret store rejected {name}: {reason}")]
    Rejected { name: String, reason: String },
    /// Backend could not be reached or failed internally.
    #[error("secret store failure: {reason}")]
    Storage { reason: String },
}

/// Remote or local named-secret storage (vaults, cloud secret managers).
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Persist bytes under a name, replacing any previous version.
    async fn put(&self, name: &str, value: &[u8]) -> Result<(), SecretStoreError>;

    /// Remove a secret (idempotent).
    async fn delete(&self, name: &str) -> Result<(), SecretStoreError>;
}

/// In-memory secret store for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct InMemorySecretStore {
    inner: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a stored secret.
    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.inner.lock().ok()?.get(name).cloned()
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn put(&self, name: &str, value: &[u8]) -> Result<(), SecretStoreError> {
        let mut map = self.inner.lock().map_err(|err| SecretStoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;
        map.insert(name.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), SecretStoreError> {
        let mut map = self.inner.lock().map_err(|err| SecretStoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;
        map.remove(name);
        Ok(())
    }
}

/// Pushes encrypted keysets to a [`SecretStore`].
///
/// Only encrypted keysets are accepted: plaintext key material has no path
/// into a remote store through this type.
pub struct SecretStoreKeysetWriter<S: SecretStore> {
    store: S,
    name: String,
    format: Format,
    timeout: Duration,
}

impl<S: SecretStore> SecretStoreKeysetWriter<S> {
    pub fn new(store: S, name: impl Into<String>, format: Format) -> Self {
        Self {
            store,
            name: name.into(),
            format,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Encode and store. No retries: a timeout or store failure surfaces as
    /// `WriteError::Io` for the caller's retry policy.
    #[instrument(skip_all, fields(name = %self.name, format = %self.format))]
    pub async fn write_encrypted(&self, keyset: &EncryptedKeyset) -> Result<(), WriteError> {
        let bytes = self.format.encode_encrypted(keyset)?;

        match tokio::time::timeout(self.timeout, self.store.put(&self.name, &bytes)).await {
            Ok(Ok(())) => {
                info!(bytes = bytes.len(), "encrypted keyset stored");
                Ok(())
            }
            Ok(Err(err)) => {
                warn!(%err, "secret store rejected keyset");
                Err(WriteError::Io(io::Error::other(err)))
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "secret store timed out");
                Err(WriteError::Io(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("secret store did not answer within {:?}", self.timeout),
                )))
            }
        }
    }
}
