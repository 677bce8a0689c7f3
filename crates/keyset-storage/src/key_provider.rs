use std::{
    fmt,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Master key that wraps keysets.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    /// Identifier for logging/rotation (never log key bytes).
    #[zeroize(skip)]
    pub id: String,
    /// 256-bit symmetric key.
    bytes: [u8; 32],
}

impl MasterKey {
    pub fn new(id: impl Into<String>, bytes: [u8; 32]) -> Self {
        Self {
            id: id.into(),
            bytes,
        }
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterKey")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("keyring error: {0}")]
    Keyring(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("generation error: {0}")]
    Generation(String),
}

/// Provides the master key (OS keychain in production; memory in tests).
#[async_trait]
pub trait KeyProvider: Send + Sync {
    async fn get_or_create(&self) -> Result<MasterKey, KeyError>;
}

/// OS keyring-backed provider. Creates the key on first use.
pub struct KeyringProvider {
    service: String,
    account: String,
}

impl KeyringProvider {
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }
}

#[async_trait]
impl KeyProvider for KeyringProvider {
    async fn get_or_create(&self) -> Result<MasterKey, KeyError> {
        // Keyring operations are synchronous; wrapped in async for trait compatibility.
        let entry = keyring::Entry::new(&self.service, &self.account)
            .map_err(|e| KeyError::Keyring(e.to_string()))?;

        match entry.get_password() {
            Ok(secret) => decode_key(&self.account, &secret),
            Err(keyring::Error::NoEntry) => {
                let key = generate_key(&self.account);
                entry
                    .set_password(&encode_key(&key))
                    .map_err(|e| KeyError::Keyring(e.to_string()))?;
                Ok(key)
            }
            Err(err) => Err(KeyError::Keyring(err.to_string())),
        }
    }
}

/// In-memory key provider for tests and ephemeral sessions.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKeyProvider {
    inner: Arc<Mutex<Option<MasterKey>>>,
}

impl InMemoryKeyProvider {
    /// Provider pinned to a known key.
    pub fn with_key(key: MasterKey) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(key))),
        }
    }
}

#[async_trait]
impl KeyProvider for InMemoryKeyProvider {
    async fn get_or_create(&self) -> Result<MasterKey, KeyError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|err| KeyError::Generation(format!("lock poisoned: {err}")))?;

        if let Some(existing) = guard.clone() {
            return Ok(existing);
        }

        let key = generate_key("memory");
        *guard = Some(key.clone());
        Ok(key)
    }
}

fn generate_key(id: &str) -> MasterKey {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    MasterKey::new(id, bytes)
}

fn encode_key(key: &MasterKey) -> String {
    general_purpose::STANDARD.encode(key.bytes)
}

fn decode_key(id: &str, secret: &str) -> Result<MasterKey, KeyError> {
    let mut bytes = general_purpose::STANDARD
        .decode(secret)
        .map_err(|e| KeyError::Decode(e.to_string()))?;

    if bytes.len() != 32 {
        let len = bytes.len();
        bytes.zeroize();
        return Err(KeyError::Decode(format!("expected 32 bytes, got {len}")));
    }

    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    bytes.zeroize();
    Ok(MasterKey::new(id, out))
}
