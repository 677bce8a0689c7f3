use std::{fs, path::Path};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use color_eyre::{eyre::WrapErr, Result};
use keyset_core::{
    KeyData, KeyMaterialType, KeyStatus, Keyset, KeysetKey, OutputPrefixType, SecretBytes,
};
use serde::Deserialize;

/// Human-authored keyset description, e.g.
///
/// ```toml
/// primary_key_id = 1
///
/// [[key]]
/// key_id = 1
/// status = "enabled"
/// output_prefix_type = "tink"
/// type_url = "type.googleapis.com/google.crypto.tink.AesGcmKey"
/// key_material_type = "symmetric"
/// value = "<base64>"
/// ```
///
/// Required-field checks are left to the writers so the CLI reports the same
/// serialization errors a library caller would get. Unknown fields are
/// rejected so a misspelled option never silently falls back to its default.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub primary_key_id: u32,
    #[serde(default, rename = "key")]
    pub keys: Vec<ManifestKey>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestKey {
    pub key_id: u32,
    pub status: ManifestStatus,
    #[serde(default)]
    pub output_prefix_type: ManifestPrefix,
    pub type_url: Option<String>,
    #[serde(default)]
    pub key_material_type: ManifestMaterial,
    /// Base64 key material; omitted for destroyed keys.
    pub value: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestStatus {
    Enabled,
    Disabled,
    Destroyed,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestPrefix {
    #[default]
    Tink,
    Legacy,
    Raw,
    Crunchy,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestMaterial {
    #[default]
    Symmetric,
    AsymmetricPrivate,
    AsymmetricPublic,
    Remote,
}

impl From<ManifestStatus> for KeyStatus {
    fn from(value: ManifestStatus) -> Self {
        match value {
            ManifestStatus::Enabled => KeyStatus::Enabled,
            ManifestStatus::Disabled => KeyStatus::Disabled,
            ManifestStatus::Destroyed => KeyStatus::Destroyed,
        }
    }
}

impl From<ManifestPrefix> for OutputPrefixType {
    fn from(value: ManifestPrefix) -> Self {
        match value {
            ManifestPrefix::Tink => OutputPrefixType::Tink,
            ManifestPrefix::Legacy => OutputPrefixType::Legacy,
            ManifestPrefix::Raw => OutputPrefixType::Raw,
            ManifestPrefix::Crunchy => OutputPrefixType::Crunchy,
        }
    }
}

impl From<ManifestMaterial> for KeyMaterialType {
    fn from(value: ManifestMaterial) -> Self {
        match value {
            ManifestMaterial::Symmetric => KeyMaterialType::Symmetric,
            ManifestMaterial::AsymmetricPrivate => KeyMaterialType::AsymmetricPrivate,
            ManifestMaterial::AsymmetricPublic => KeyMaterialType::AsymmetricPublic,
            ManifestMaterial::Remote => KeyMaterialType::Remote,
        }
    }
}

impl Manifest {
    pub fn into_keyset(self) -> Result<Keyset> {
        let keys = self
            .keys
            .into_iter()
            .map(ManifestKey::into_key)
            .collect::<Result<Vec<_>>>()?;
        Ok(Keyset::new(self.primary_key_id, keys))
    }
}

impl ManifestKey {
    fn into_key(self) -> Result<KeysetKey> {
        let key_id = self.key_id;
        let key_data = self
            .value
            .map(|encoded| {
                STANDARD
                    .decode(encoded.trim())
                    .wrap_err_with(|| format!("key {key_id}: value is not valid base64"))
            })
            .transpose()?
            .map(|bytes| KeyData {
                type_url: self.type_url.unwrap_or_default(),
                value: SecretBytes::new(bytes),
                key_material_type: self.key_material_type.into(),
            });

        Ok(KeysetKey {
            key_data,
            status: self.status.into(),
            key_id,
            output_prefix_type: self.output_prefix_type.into(),
        })
    }
}

pub fn parse(contents: &str) -> Result<Keyset> {
    let manifest: Manifest = toml::from_str(contents)?;
    manifest.into_keyset()
}

pub fn load(path: &Path) -> Result<Keyset> {
    let contents = fs::read_to_string(path)
        .wrap_err_with(|| format!("reading manifest {}", path.display()))?;
    parse(&contents).wrap_err_with(|| format!("parsing manifest {}", path.display()))
}
