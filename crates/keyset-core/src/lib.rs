//! Core abstractions for keyset writing: the keyset data model and the
//! plaintext/encrypted writer contracts. Concrete formats and sinks live in
//! `keyset-codec` and `keyset-storage`.

pub mod keyset;
pub mod writer;

pub use keyset::{
    EncryptedKeyset, KeyData, KeyInfo, KeyMaterialType, KeyStatus, KeysetInfo, KeysetKey,
    Keyset, OutputPrefixType, SecretBytes,
};
pub use writer::{
    ensure_encodable, ensure_encrypted_encodable, EncryptedKeysetWriter, KeysetWriter, WriteError,
    WriteErrorKind,
};
