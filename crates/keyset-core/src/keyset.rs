use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Lifecycle state of a key inside a keyset.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyStatus {
    Enabled,
    Disabled,
    Destroyed,
}

/// How ciphertexts/signatures produced by a key are prefixed.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputPrefixType {
    Tink,
    Legacy,
    Raw,
    Crunchy,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyMaterialType {
    Symmetric,
    AsymmetricPrivate,
    AsymmetricPublic,
    Remote,
}

impl fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            KeyStatus::Enabled => "enabled",
            KeyStatus::Disabled => "disabled",
            KeyStatus::Destroyed => "destroyed",
        })
    }
}

impl fmt::Display for OutputPrefixType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            OutputPrefixType::Tink => "tink",
            OutputPrefixType::Legacy => "legacy",
            OutputPrefixType::Raw => "raw",
            OutputPrefixType::Crunchy => "crunchy",
        })
    }
}

/// Raw key bytes. Zeroized on drop and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretBytes(Vec<u8>);

impl SecretBytes {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes(<{} bytes redacted>)", self.0.len())
    }
}

impl From<Vec<u8>> for SecretBytes {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl Serialize for SecretBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_base64(&self.0, serializer)
    }
}

fn serialize_base64<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    let encoded = Zeroizing::new(STANDARD.encode(bytes));
    serializer.serialize_str(&encoded)
}

/// Key material plus the type url of the primitive that consumes it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KeyData {
    pub type_url: String,
    pub value: SecretBytes,
    pub key_material_type: KeyMaterialType,
}

/// One entry of a keyset.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KeysetKey {
    /// Destroyed keys may carry no material.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_data: Option<KeyData>,
    pub status: KeyStatus,
    pub key_id: u32,
    pub output_prefix_type: OutputPrefixType,
}

/// Ordered collection of keys with a primary designation.
///
/// Uniqueness of ids and the single-enabled-primary rule are the producer's
/// responsibility; writers only require the value to be encodable.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Keyset {
    pub primary_key_id: u32,
    #[serde(rename = "key")]
    pub keys: Vec<KeysetKey>,
}

impl Keyset {
    pub fn new(primary_key_id: u32, keys: Vec<KeysetKey>) -> Self {
        Self {
            primary_key_id,
            keys,
        }
    }

    /// Structural description of the keyset without any key material.
    pub fn info(&self) -> KeysetInfo {
        KeysetInfo {
            primary_key_id: self.primary_key_id,
            key_info: self
                .keys
                .iter()
                .map(|key| KeyInfo {
                    type_url: key
                        .key_data
                        .as_ref()
                        .map(|data| data.type_url.clone())
                        .unwrap_or_default(),
                    status: key.status,
                    key_id: key.key_id,
                    output_prefix_type: key.output_prefix_type,
                })
                .collect(),
        }
    }
}

/// Cleartext metadata about one key of an encrypted keyset.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KeyInfo {
    pub type_url: String,
    pub status: KeyStatus,
    pub key_id: u32,
    pub output_prefix_type: OutputPrefixType,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KeysetInfo {
    pub primary_key_id: u32,
    pub key_info: Vec<KeyInfo>,
}

/// A serialized keyset encrypted under a master key, plus optional metadata.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedKeyset {
    #[serde(serialize_with = "serialize_base64")]
    pub encrypted_keyset: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyset_info: Option<KeysetInfo>,
}

impl EncryptedKeyset {
    pub fn new(encrypted_keyset: Vec<u8>, keyset_info: Option<KeysetInfo>) -> Self {
        Self {
            encrypted_keyset,
            keyset_info,
        }
    }
}
