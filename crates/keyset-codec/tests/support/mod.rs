//! Minimal readers for the two formats, used to check round trips.
//! Reading is not part of the library surface.
#![allow(dead_code)]

use std::io::{Cursor, Read};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use byteorder::{BigEndian, ReadBytesExt};
use keyset_codec::binary::{MAGIC, VARIANT_ENCRYPTED, VARIANT_KEYSET, VERSION};
use keyset_core::{
    EncryptedKeyset, KeyData, KeyInfo, KeyMaterialType, KeyStatus, Keyset, KeysetInfo, KeysetKey,
    OutputPrefixType, SecretBytes,
};
use serde_json::Value;

pub const AES_TYPE_URL: &str = "type.googleapis.com/google.crypto.tink.AesGcmKey";
pub const ED25519_TYPE_URL: &str = "type.googleapis.com/google.crypto.tink.Ed25519PrivateKey";

/// Recognisable key bytes so tests can scan output for leaks.
pub const PLAINTEXT_KEY: &[u8] = b"PLAINTEXT-KEY-MATERIAL-0123456789";

pub fn sample_keyset() -> Keyset {
    Keyset::new(
        2_000_001,
        vec![
            KeysetKey {
                key_data: Some(KeyData {
                    type_url: AES_TYPE_URL.into(),
                    value: SecretBytes::new(PLAINTEXT_KEY.to_vec()),
                    key_material_type: KeyMaterialType::Symmetric,
                }),
                status: KeyStatus::Enabled,
                key_id: 2_000_001,
                output_prefix_type: OutputPrefixType::Tink,
            },
            KeysetKey {
                key_data: Some(KeyData {
                    type_url: ED25519_TYPE_URL.into(),
                    value: SecretBytes::new(vec![0x42; 32]),
                    key_material_type: KeyMaterialType::AsymmetricPrivate,
                }),
                status: KeyStatus::Disabled,
                key_id: 17,
                output_prefix_type: OutputPrefixType::Raw,
            },
            KeysetKey {
                key_data: None,
                status: KeyStatus::Destroyed,
                key_id: 3,
                output_prefix_type: OutputPrefixType::Legacy,
            },
        ],
    )
}

pub enum Decoded {
    Keyset(Keyset),
    Encrypted(EncryptedKeyset),
}

pub fn decode_binary(bytes: &[u8]) -> Decoded {
    let mut cur = Cursor::new(bytes);
    let mut magic = [0u8; 4];
    cur.read_exact(&mut magic).expect("magic");
    assert_eq!(&magic, MAGIC);
    assert_eq!(cur.read_u8().expect("version"), VERSION);
    let decoded = match cur.read_u8().expect("variant") {
        VARIANT_KEYSET => Decoded::Keyset(read_keyset(&mut cur)),
        VARIANT_ENCRYPTED => Decoded::Encrypted(read_encrypted(&mut cur)),
        other => panic!("unknown variant {other}"),
    };
    assert_eq!(cur.position() as usize, bytes.len(), "trailing bytes");
    decoded
}

fn read_keyset(cur: &mut Cursor<&[u8]>) -> Keyset {
    let primary_key_id = cur.read_u32::<BigEndian>().expect("primary");
    let count = cur.read_u32::<BigEndian>().expect("count");
    let keys = (0..count)
        .map(|_| {
            let key_id = cur.read_u32::<BigEndian>().expect("id");
            let status = status(cur.read_u8().expect("status"));
            let output_prefix_type = prefix(cur.read_u8().expect("prefix"));
            let key_data = match cur.read_u8().expect("has data") {
                0 => None,
                _ => {
                    let type_url = read_str16(cur);
                    let key_material_type = material(cur.read_u8().expect("material"));
                    let value = SecretBytes::new(read_bytes32(cur));
                    Some(KeyData {
                        type_url,
                        value,
                        key_material_type,
                    })
                }
            };
            KeysetKey {
                key_data,
                status,
                key_id,
                output_prefix_type,
            }
        })
        .collect();
    Keyset::new(primary_key_id, keys)
}

fn read_encrypted(cur: &mut Cursor<&[u8]>) -> EncryptedKeyset {
    let ciphertext = read_bytes32(cur);
    let info = match cur.read_u8().expect("has info") {
        0 => None,
        _ => {
            let primary_key_id = cur.read_u32::<BigEndian>().expect("primary");
            let count = cur.read_u32::<BigEndian>().expect("count");
            let key_info = (0..count)
                .map(|_| KeyInfo {
                    type_url: read_str16(cur),
                    status: status(cur.read_u8().expect("status")),
                    key_id: cur.read_u32::<BigEndian>().expect("id"),
                    output_prefix_type: prefix(cur.read_u8().expect("prefix")),
                })
                .collect();
            Some(KeysetInfo {
                primary_key_id,
                key_info,
            })
        }
    };
    EncryptedKeyset::new(ciphertext, info)
}

fn read_str16(cur: &mut Cursor<&[u8]>) -> String {
    let len = cur.read_u16::<BigEndian>().expect("str len");
    let mut buf = vec![0u8; usize::from(len)];
    cur.read_exact(&mut buf).expect("str");
    String::from_utf8(buf).expect("utf8")
}

fn read_bytes32(cur: &mut Cursor<&[u8]>) -> Vec<u8> {
    let len = cur.read_u32::<BigEndian>().expect("bytes len");
    let mut buf = vec![0u8; len as usize];
    cur.read_exact(&mut buf).expect("bytes");
    buf
}

fn status(code: u8) -> KeyStatus {
    match code {
        1 => KeyStatus::Enabled,
        2 => KeyStatus::Disabled,
        3 => KeyStatus::Destroyed,
        other => panic!("bad status {other}"),
    }
}

fn prefix(code: u8) -> OutputPrefixType {
    match code {
        1 => OutputPrefixType::Tink,
        2 => OutputPrefixType::Legacy,
        3 => OutputPrefixType::Raw,
        4 => OutputPrefixType::Crunchy,
        other => panic!("bad prefix {other}"),
    }
}

fn material(code: u8) -> KeyMaterialType {
    match code {
        1 => KeyMaterialType::Symmetric,
        2 => KeyMaterialType::AsymmetricPrivate,
        3 => KeyMaterialType::AsymmetricPublic,
        4 => KeyMaterialType::Remote,
        other => panic!("bad material {other}"),
    }
}

pub fn decode_json_keyset(bytes: &[u8]) -> Keyset {
    let value: Value = serde_json::from_slice(bytes).expect("json");
    let keys = value["key"]
        .as_array()
        .expect("key array")
        .iter()
        .map(|key| KeysetKey {
            key_data: key.get("keyData").map(|data| KeyData {
                type_url: data["typeUrl"].as_str().expect("typeUrl").to_string(),
                value: SecretBytes::new(
                    STANDARD
                        .decode(data["value"].as_str().expect("value"))
                        .expect("base64"),
                ),
                key_material_type: json_material(data["keyMaterialType"].as_str().expect("mt")),
            }),
            status: json_status(key["status"].as_str().expect("status")),
            key_id: json_u32(&key["keyId"]),
            output_prefix_type: json_prefix(key["outputPrefixType"].as_str().expect("prefix")),
        })
        .collect();
    Keyset::new(json_u32(&value["primaryKeyId"]), keys)
}

pub fn decode_json_encrypted(bytes: &[u8]) -> EncryptedKeyset {
    let value: Value = serde_json::from_slice(bytes).expect("json");
    let ciphertext = STANDARD
        .decode(value["encryptedKeyset"].as_str().expect("ciphertext"))
        .expect("base64");
    let info = value.get("keysetInfo").map(|info| KeysetInfo {
        primary_key_id: json_u32(&info["primaryKeyId"]),
        key_info: info["keyInfo"]
            .as_array()
            .expect("keyInfo")
            .iter()
            .map(|entry| KeyInfo {
                type_url: entry["typeUrl"].as_str().expect("typeUrl").to_string(),
                status: json_status(entry["status"].as_str().expect("status")),
                key_id: json_u32(&entry["keyId"]),
                output_prefix_type: json_prefix(entry["outputPrefixType"].as_str().expect("p")),
            })
            .collect(),
    });
    EncryptedKeyset::new(ciphertext, info)
}

fn json_u32(value: &Value) -> u32 {
    u32::try_from(value.as_u64().expect("number")).expect("u32")
}

fn json_status(name: &str) -> KeyStatus {
    match name {
        "ENABLED" => KeyStatus::Enabled,
        "DISABLED" => KeyStatus::Disabled,
        "DESTROYED" => KeyStatus::Destroyed,
        other => panic!("bad status {other}"),
    }
}

fn json_prefix(name: &str) -> OutputPrefixType {
    match name {
        "TINK" => OutputPrefixType::Tink,
        "LEGACY" => OutputPrefixType::Legacy,
        "RAW" => OutputPrefixType::Raw,
        "CRUNCHY" => OutputPrefixType::Crunchy,
        other => panic!("bad prefix {other}"),
    }
}

fn json_material(name: &str) -> KeyMaterialType {
    match name {
        "SYMMETRIC" => KeyMaterialType::Symmetric,
        "ASYMMETRIC_PRIVATE" => KeyMaterialType::AsymmetricPrivate,
        "ASYMMETRIC_PUBLIC" => KeyMaterialType::AsymmetricPublic,
        "REMOTE" => KeyMaterialType::Remote,
        other => panic!("bad material {other}"),
    }
}
