//! Wire formats for keysets. Every writer here encodes the whole value in
//! memory before touching its sink, so a value that cannot be encoded never
//! produces partial output.

pub mod binary;
pub mod json;

use std::{fmt, io::Write, str::FromStr};

use keyset_core::{EncryptedKeyset, Keyset, WriteError};
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

pub use binary::BinaryKeysetWriter;
pub use json::JsonKeysetWriter;

/// Supported serialization formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Json,
    Binary,
}

impl Format {
    /// Plaintext key material lives in the returned buffer until it drops.
    pub fn encode_keyset(self, keyset: &Keyset) -> Result<Zeroizing<Vec<u8>>, WriteError> {
        match self {
            Format::Json => json::encode_keyset(keyset, false),
            Format::Binary => binary::encode_keyset(keyset),
        }
    }

    pub fn encode_encrypted(self, keyset: &EncryptedKeyset) -> Result<Vec<u8>, WriteError> {
        match self {
            Format::Json => json::encode_encrypted(keyset, false),
            Format::Binary => binary::encode_encrypted(keyset),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Binary => "binary",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "binary" | "bin" => Ok(Format::Binary),
            other => Err(format!("unknown keyset format: {other}")),
        }
    }
}

/// Hands fully encoded bytes to a sink. Short writes surface as `Io`.
pub(crate) fn deliver<W: Write>(sink: &mut W, bytes: &[u8]) -> Result<(), WriteError> {
    sink.write_all(bytes)?;
    sink.flush()?;
    debug!(bytes = bytes.len(), "keyset bytes delivered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_format_names() {
        assert_eq!("json".parse::<Format>(), Ok(Format::Json));
        assert_eq!("BINARY".parse::<Format>(), Ok(Format::Binary));
        assert_eq!("bin".parse::<Format>(), Ok(Format::Binary));
        assert!("proto".parse::<Format>().is_err());
    }

    #[test]
    fn format_display_matches_parse() {
        for format in [Format::Json, Format::Binary] {
            assert_eq!(format.to_string().parse::<Format>(), Ok(format));
        }
    }
}
