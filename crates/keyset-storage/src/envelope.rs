use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    Aes256Gcm,
};
use keyset_codec::binary;
use keyset_core::{EncryptedKeyset, Keyset, WriteError};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::key_provider::{KeyError, KeyProvider};

/// Associated data bound into every keyset ciphertext.
pub const ASSOCIATED_DATA: &[u8] = b"keyset";
pub const NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("master key unavailable: {0}")]
    Key(#[from] KeyError),
    #[error("keyset cannot be encoded: {0}")]
    Encode(#[from] WriteError),
    #[error("encryption failed: {0}")]
    Encrypt(String),
}

/// Produces [`EncryptedKeyset`] values by sealing the binary encoding of a
/// keyset under the provider's master key with AES-256-GCM.
///
/// Ciphertext layout is `nonce (12 bytes) || ciphertext+tag`.
pub struct KeysetEncryptor<P: KeyProvider> {
    key_provider: P,
}

impl<P: KeyProvider> KeysetEncryptor<P> {
    pub fn new(key_provider: P) -> Self {
        Self { key_provider }
    }

    #[instrument(skip_all, fields(keys = keyset.keys.len()))]
    pub async fn encrypt(&self, keyset: &Keyset) -> Result<EncryptedKeyset, EnvelopeError> {
        let plaintext = binary::encode_keyset(keyset)?;
        let master = self.key_provider.get_or_create().await?;

        let cipher = Aes256Gcm::new_from_slice(master.as_bytes())
            .map_err(|e| EnvelopeError::Encrypt(format!("cipher init failed: {e}")))?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: plaintext.as_slice(),
                    aad: ASSOCIATED_DATA,
                },
            )
            .map_err(|e| EnvelopeError::Encrypt(e.to_string()))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + sealed.len());
        blob.extend_from_slice(nonce.as_slice());
        blob.extend_from_slice(&sealed);
        debug!(master_key = %master.id, bytes = blob.len(), "keyset sealed");

        Ok(EncryptedKeyset::new(blob, Some(keyset.info())))
    }
}
