use std::io::Write;

use keyset_core::{
    ensure_encodable, ensure_encrypted_encodable, EncryptedKeyset, EncryptedKeysetWriter, Keyset,
    KeysetWriter, WriteError,
};
use serde::Serialize;
use tracing::instrument;
use zeroize::Zeroizing;

use crate::deliver;

/// JSON keyset writer over any byte sink.
///
/// Field names are camelCase and binary fields are standard base64. Output
/// is byte-identical for equal inputs.
pub struct JsonKeysetWriter<W: Write> {
    sink: W,
    pretty: bool,
}

impl<W: Write> JsonKeysetWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            pretty: false,
        }
    }

    /// Indent output for humans.
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: Write> KeysetWriter for JsonKeysetWriter<W> {
    #[instrument(skip_all, fields(format = "json", keys = keyset.keys.len()))]
    fn write(&mut self, keyset: &Keyset) -> Result<(), WriteError> {
        let bytes = encode_keyset(keyset, self.pretty)?;
        deliver(&mut self.sink, &bytes)
    }
}

impl<W: Write> EncryptedKeysetWriter for JsonKeysetWriter<W> {
    #[instrument(skip_all, fields(format = "json", ciphertext = keyset.encrypted_keyset.len()))]
    fn write_encrypted(&mut self, keyset: &EncryptedKeyset) -> Result<(), WriteError> {
        let bytes = encode_encrypted(keyset, self.pretty)?;
        deliver(&mut self.sink, &bytes)
    }
}

/// Plaintext encoding, wiped on drop. The buffer is reserved from the key
/// sizes so growth (and the stale copies it leaves) is rare.
pub fn encode_keyset(keyset: &Keyset, pretty: bool) -> Result<Zeroizing<Vec<u8>>, WriteError> {
    ensure_encodable(keyset)?;
    let mut buf = Zeroizing::new(Vec::with_capacity(keyset_len_hint(keyset, pretty)));
    write_json(&mut *buf, keyset, pretty)?;
    Ok(buf)
}

pub fn encode_encrypted(keyset: &EncryptedKeyset, pretty: bool) -> Result<Vec<u8>, WriteError> {
    ensure_encrypted_encodable(keyset)?;
    let mut buf = Vec::new();
    write_json(&mut buf, keyset, pretty)?;
    Ok(buf)
}

fn write_json<T: Serialize>(buf: &mut Vec<u8>, value: &T, pretty: bool) -> Result<(), WriteError> {
    let written = if pretty {
        serde_json::to_writer_pretty(buf, value)
    } else {
        serde_json::to_writer(buf, value)
    };
    written.map_err(|e| WriteError::serialization(e.to_string()))
}

fn keyset_len_hint(keyset: &Keyset, pretty: bool) -> usize {
    let keys: usize = keyset
        .keys
        .iter()
        .map(|key| {
            160 + key
                .key_data
                .as_ref()
                .map_or(0, |data| data.type_url.len() + data.value.len().div_ceil(3) * 4)
        })
        .sum();
    let hint = 64 + keys;
    if pretty {
        hint * 2
    } else {
        hint
    }
}

#[cfg(test)]
mod tests {
    use keyset_core::{
        KeyData, KeyMaterialType, KeyStatus, KeysetKey, OutputPrefixType, SecretBytes,
    };

    use super::*;

    fn keyset() -> Keyset {
        Keyset::new(
            42,
            vec![
                KeysetKey {
                    key_data: Some(KeyData {
                        type_url: "type.googleapis.com/google.crypto.tink.HmacKey".into(),
                        value: SecretBytes::new(b"hmac".to_vec()),
                        key_material_type: KeyMaterialType::Symmetric,
                    }),
                    status: KeyStatus::Enabled,
                    key_id: 42,
                    output_prefix_type: OutputPrefixType::Tink,
                },
                KeysetKey {
                    key_data: None,
                    status: KeyStatus::Destroyed,
                    key_id: 7,
                    output_prefix_type: OutputPrefixType::Legacy,
                },
            ],
        )
    }

    #[test]
    fn writes_compact_json_with_stable_layout() {
        let mut writer = JsonKeysetWriter::new(Vec::new());
        writer.write(&keyset()).expect("write");
        let out = String::from_utf8(writer.into_inner()).expect("utf8");
        assert_eq!(
            out,
            concat!(
                r#"{"primaryKeyId":42,"key":["#,
                r#"{"keyData":{"typeUrl":"type.googleapis.com/google.crypto.tink.HmacKey","#,
                r#""value":"aG1hYw==","keyMaterialType":"SYMMETRIC"},"#,
                r#""status":"ENABLED","keyId":42,"outputPrefixType":"TINK"},"#,
                r#"{"status":"DESTROYED","keyId":7,"outputPrefixType":"LEGACY"}]}"#
            )
        );
    }

    #[test]
    fn keyset_encoding_fits_reserved_buffer() {
        for pretty in [false, true] {
            let bytes = encode_keyset(&keyset(), pretty).expect("encode");
            assert!(bytes.len() <= keyset_len_hint(&keyset(), pretty));
        }
    }

    #[test]
    fn pretty_output_is_indented() {
        let mut writer = JsonKeysetWriter::new(Vec::new()).pretty();
        writer.write(&keyset()).expect("write");
        let out = String::from_utf8(writer.into_inner()).expect("utf8");
        assert!(out.contains("\n  \"primaryKeyId\": 42"));
    }

    #[test]
    fn writes_encrypted_keyset_without_info() {
        let mut writer = JsonKeysetWriter::new(Vec::new());
        writer
            .write_encrypted(&EncryptedKeyset::new(vec![0xde, 0xad], None))
            .expect("write");
        assert_eq!(writer.into_inner(), br#"{"encryptedKeyset":"3q0="}"#.to_vec());
    }

    #[test]
    fn encrypted_keyset_carries_info() {
        let info = keyset().info();
        let bytes = encode_encrypted(&EncryptedKeyset::new(vec![1], Some(info)), false)
            .expect("encode");
        let value: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(value["keysetInfo"]["primaryKeyId"], 42);
        assert_eq!(value["keysetInfo"]["keyInfo"][1]["status"], "DESTROYED");
        assert_eq!(value["keysetInfo"]["keyInfo"][1]["typeUrl"], "");
    }
}
