use std::{
    io::{self, Write},
    path::Path,
};

use color_eyre::Result;
use keyset_codec::{BinaryKeysetWriter, Format, JsonKeysetWriter};
use keyset_core::{EncryptedKeyset, EncryptedKeysetWriter, Keyset, KeysetWriter, WriteError};
use keyset_storage::{
    atomic_file::FileKeysetWriter, envelope::KeysetEncryptor, key_provider::KeyProvider,
};
use tracing::info;

use crate::{cli::WriteArgs, config::Config, manifest, storage};

/// Execute `keyset write` against the configured keyring.
pub async fn handle_write(args: WriteArgs, config: &Config) -> Result<()> {
    let format = args.format.or(config.default_format).unwrap_or_default();
    let provider = storage::key_provider_from_config(config);
    write_with(&args, format, provider, || io::stdout().lock()).await?;

    if let Some(path) = &args.out {
        let kind = if args.encrypt { "encrypted keyset" } else { "keyset" };
        println!("Wrote {kind} ({format}) to {}", path.display());
    }
    Ok(())
}

/// Execute `keyset info`.
pub fn handle_info(manifest_path: &Path) -> Result<()> {
    let keyset = manifest::load(manifest_path)?;
    print!("{}", describe(&keyset));
    Ok(())
}

/// `open_stream` is only called once the keyset (and its encryption) is
/// ready, so stdout is not held across the key provider call.
async fn write_with<P: KeyProvider, W: Write>(
    args: &WriteArgs,
    format: Format,
    provider: P,
    open_stream: impl FnOnce() -> W,
) -> Result<()> {
    let keyset = manifest::load(&args.manifest)?;

    if args.encrypt {
        let encrypted = KeysetEncryptor::new(provider).encrypt(&keyset).await?;
        Destination::new(args.out.as_deref(), format, open_stream).write_encrypted(&encrypted)?;
    } else {
        Destination::new(args.out.as_deref(), format, open_stream).write(&keyset)?;
    }
    info!(encrypted = args.encrypt, %format, "keyset written");
    Ok(())
}

/// Either an atomically replaced file or a stream such as stdout.
enum Destination<W: Write> {
    File(FileKeysetWriter),
    Json(JsonKeysetWriter<W>),
    Binary(BinaryKeysetWriter<W>),
}

impl<W: Write> Destination<W> {
    fn new(out: Option<&Path>, format: Format, open_stream: impl FnOnce() -> W) -> Self {
        match (out, format) {
            (Some(path), format) => Destination::File(FileKeysetWriter::new(path, format)),
            (None, Format::Json) => Destination::Json(JsonKeysetWriter::new(open_stream())),
            (None, Format::Binary) => Destination::Binary(BinaryKeysetWriter::new(open_stream())),
        }
    }
}

impl<W: Write> KeysetWriter for Destination<W> {
    fn write(&mut self, keyset: &Keyset) -> Result<(), WriteError> {
        match self {
            Destination::File(writer) => writer.write(keyset),
            Destination::Json(writer) => writer.write(keyset),
            Destination::Binary(writer) => writer.write(keyset),
        }
    }
}

impl<W: Write> EncryptedKeysetWriter for Destination<W> {
    fn write_encrypted(&mut self, keyset: &EncryptedKeyset) -> Result<(), WriteError> {
        match self {
            Destination::File(writer) => writer.write_encrypted(keyset),
            Destination::Json(writer) => writer.write_encrypted(keyset),
            Destination::Binary(writer) => writer.write_encrypted(keyset),
        }
    }
}

fn describe(keyset: &Keyset) -> String {
    let info = keyset.info();
    let mut out = format!("primary key: {}\n", info.primary_key_id);
    for key in &info.key_info {
        let marker = if key.key_id == info.primary_key_id { "*" } else { " " };
        let type_url = if key.type_url.is_empty() { "-" } else { key.type_url.as_str() };
        out.push_str(&format!(
            "{marker} {:>10}  {:<9}  {:<7}  {type_url}\n",
            key.key_id, key.status, key.output_prefix_type
        ));
    }
    out
}
