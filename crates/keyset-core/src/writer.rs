use std::io;

use thiserror::Error;

use crate::keyset::{EncryptedKeyset, KeyStatus, Keyset};

/// Errors produced by keyset writers.
///
/// The two variants are deliberately coarse: callers may retry `Io`, never
/// `Serialization`.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The value cannot be encoded in the writer's format.
    #[error("keyset cannot be serialized: {reason}")]
    Serialization { reason: String },
    /// The destination rejected the bytes (including short writes).
    #[error("keyset destination failed: {0}")]
    Io(#[from] io::Error),
}

/// Discriminant of a [`WriteError`], handy for logging and retry policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteErrorKind {
    Serialization,
    Io,
}

impl WriteError {
    pub fn serialization(reason: impl Into<String>) -> Self {
        WriteError::Serialization {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> WriteErrorKind {
        match self {
            WriteError::Serialization { .. } => WriteErrorKind::Serialization,
            WriteError::Io(_) => WriteErrorKind::Io,
        }
    }

    /// Whether a caller-side retry could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WriteError::Io(_))
    }
}

/// Writes plaintext keysets to some destination.
pub trait KeysetWriter {
    fn write(&mut self, keyset: &Keyset) -> Result<(), WriteError>;
}

/// Writes encrypted keysets to some destination.
///
/// Kept separate from [`KeysetWriter`] so a sink meant for ciphertext only
/// can refuse plaintext at compile time.
pub trait EncryptedKeysetWriter {
    fn write_encrypted(&mut self, keyset: &EncryptedKeyset) -> Result<(), WriteError>;
}

/// Checks the fields every format requires. Does not check the primary-key
/// or id-uniqueness rules.
pub fn ensure_encodable(keyset: &Keyset) -> Result<(), WriteError> {
    for key in &keyset.keys {
        match &key.key_data {
            Some(data) if data.type_url.is_empty() => {
                return Err(WriteError::serialization(format!(
                    "key {} has an empty type url",
                    key.key_id
                )));
            }
            Some(_) => {}
            None if key.status == KeyStatus::Destroyed => {}
            None => {
                return Err(WriteError::serialization(format!(
                    "key {} is {} but has no key data",
                    key.key_id, key.status
                )));
            }
        }
    }
    Ok(())
}

/// Only the ciphertext is required; metadata entries for destroyed keys may
/// legitimately carry an empty type url.
pub fn ensure_encrypted_encodable(keyset: &EncryptedKeyset) -> Result<(), WriteError> {
    if keyset.encrypted_keyset.is_empty() {
        return Err(WriteError::serialization("encrypted keyset has no ciphertext"));
    }
    Ok(())
}
