//! Compact binary keyset format.
//!
//! ```text
//! header    := "KSET" version:u8 variant:u8
//! keyset    := primary:u32 count:u32 key*
//! key       := id:u32 status:u8 prefix:u8 has_data:u8 [type_url:str16 material:u8 value:bytes32]
//! encrypted := ciphertext:bytes32 has_info:u8 [primary:u32 count:u32 info*]
//! info      := type_url:str16 status:u8 id:u32 prefix:u8
//! ```
//!
//! Integers are big-endian; `str16`/`bytes32` carry a u16/u32 length prefix.

use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};
use keyset_core::{
    ensure_encodable, ensure_encrypted_encodable, EncryptedKeyset, EncryptedKeysetWriter,
    KeyMaterialType, KeyStatus, Keyset, KeysetInfo, KeysetWriter, OutputPrefixType, WriteError,
};
use tracing::instrument;
use zeroize::Zeroizing;

use crate::deliver;

pub const MAGIC: &[u8; 4] = b"KSET";
pub const VERSION: u8 = 1;
pub const VARIANT_KEYSET: u8 = 1;
pub const VARIANT_ENCRYPTED: u8 = 2;

const HEADER_LEN: usize = 6;

/// Binary keyset writer over any byte sink.
pub struct BinaryKeysetWriter<W: Write> {
    sink: W,
}

impl<W: Write> BinaryKeysetWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: Write> KeysetWriter for BinaryKeysetWriter<W> {
    #[instrument(skip_all, fields(format = "binary", keys = keyset.keys.len()))]
    fn write(&mut self, keyset: &Keyset) -> Result<(), WriteError> {
        let bytes = encode_keyset(keyset)?;
        deliver(&mut self.sink, &bytes)
    }
}

impl<W: Write> EncryptedKeysetWriter for BinaryKeysetWriter<W> {
    #[instrument(skip_all, fields(format = "binary", ciphertext = keyset.encrypted_keyset.len()))]
    fn write_encrypted(&mut self, keyset: &EncryptedKeyset) -> Result<(), WriteError> {
        let bytes = encode_encrypted(keyset)?;
        deliver(&mut self.sink, &bytes)
    }
}

/// Plaintext encoding. The buffer is sized up front so key material is never
/// left behind in a reallocated block, and it is wiped on drop.
pub fn encode_keyset(keyset: &Keyset) -> Result<Zeroizing<Vec<u8>>, WriteError> {
    ensure_encodable(keyset)?;

    let mut enc = Encoder::new(VARIANT_KEYSET, keyset_len(keyset))?;
    enc.u32(keyset.primary_key_id)?;
    enc.count(keyset.keys.len())?;
    for key in &keyset.keys {
        enc.u32(key.key_id)?;
        enc.u8(status_code(key.status))?;
        enc.u8(prefix_code(key.output_prefix_type))?;
        match &key.key_data {
            Some(data) => {
                enc.u8(1)?;
                enc.str16(&data.type_url)?;
                enc.u8(material_code(data.key_material_type))?;
                enc.bytes32(data.value.as_bytes())?;
            }
            None => enc.u8(0)?,
        }
    }
    Ok(Zeroizing::new(enc.finish()))
}

fn keyset_len(keyset: &Keyset) -> usize {
    let keys: usize = keyset
        .keys
        .iter()
        .map(|key| {
            7 + key
                .key_data
                .as_ref()
                .map_or(0, |data| 2 + data.type_url.len() + 1 + 4 + data.value.len())
        })
        .sum();
    HEADER_LEN + 8 + keys
}

pub fn encode_encrypted(keyset: &EncryptedKeyset) -> Result<Vec<u8>, WriteError> {
    ensure_encrypted_encodable(keyset)?;

    let mut enc = Encoder::new(VARIANT_ENCRYPTED, 0)?;
    enc.bytes32(&keyset.encrypted_keyset)?;
    match &keyset.keyset_info {
        Some(info) => {
            enc.u8(1)?;
            encode_info(&mut enc, info)?;
        }
        None => enc.u8(0)?,
    }
    Ok(enc.finish())
}

fn encode_info(enc: &mut Encoder, info: &KeysetInfo) -> Result<(), WriteError> {
    enc.u32(info.primary_key_id)?;
    enc.count(info.key_info.len())?;
    for entry in &info.key_info {
        enc.str16(&entry.type_url)?;
        enc.u8(status_code(entry.status))?;
        enc.u32(entry.key_id)?;
        enc.u8(prefix_code(entry.output_prefix_type))?;
    }
    Ok(())
}

pub fn status_code(status: KeyStatus) -> u8 {
    match status {
        KeyStatus::Enabled => 1,
        KeyStatus::Disabled => 2,
        KeyStatus::Destroyed => 3,
    }
}

pub fn prefix_code(prefix: OutputPrefixType) -> u8 {
    match prefix {
        OutputPrefixType::Tink => 1,
        OutputPrefixType::Legacy => 2,
        OutputPrefixType::Raw => 3,
        OutputPrefixType::Crunchy => 4,
    }
}

pub fn material_code(material: KeyMaterialType) -> u8 {
    match material {
        KeyMaterialType::Symmetric => 1,
        KeyMaterialType::AsymmetricPrivate => 2,
        KeyMaterialType::AsymmetricPublic => 3,
        KeyMaterialType::Remote => 4,
    }
}

/// In-memory buffer with length-checked field writers.
struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    fn new(variant: u8, capacity: usize) -> Result<Self, WriteError> {
        let mut enc = Self {
            buf: Vec::with_capacity(capacity.max(HEADER_LEN)),
        };
        enc.buf.extend_from_slice(MAGIC);
        enc.u8(VERSION)?;
        enc.u8(variant)?;
        Ok(enc)
    }

    fn u8(&mut self, value: u8) -> Result<(), WriteError> {
        self.buf.write_u8(value).map_err(buffer_err)
    }

    fn u32(&mut self, value: u32) -> Result<(), WriteError> {
        self.buf.write_u32::<BigEndian>(value).map_err(buffer_err)
    }

    fn count(&mut self, len: usize) -> Result<(), WriteError> {
        let len = u32::try_from(len)
            .map_err(|_| WriteError::serialization(format!("{len} entries exceed u32")))?;
        self.u32(len)
    }

    fn str16(&mut self, value: &str) -> Result<(), WriteError> {
        let len = u16::try_from(value.len()).map_err(|_| {
            WriteError::serialization(format!("type url of {} bytes exceeds u16", value.len()))
        })?;
        self.buf.write_u16::<BigEndian>(len).map_err(buffer_err)?;
        self.buf.extend_from_slice(value.as_bytes());
        Ok(())
    }

    fn bytes32(&mut self, value: &[u8]) -> Result<(), WriteError> {
        let len = u32::try_from(value.len()).map_err(|_| {
            WriteError::serialization(format!("field of {} bytes exceeds u32", value.len()))
        })?;
        self.u32(len)?;
        self.buf.extend_from_slice(value);
        Ok(())
    }

    fn finish(self) -> Vec<u8> {
        self.buf
    }
}

fn buffer_err(err: std::io::Error) -> WriteError {
    WriteError::serialization(format!("encode buffer: {err}"))
}
