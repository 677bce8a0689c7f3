mod cli;
mod config;
mod keysets;
mod manifest;
mod storage;

use std::{fs, path::Path};

use crate::cli::ConfigCommand;
use clap::Parser;
use color_eyre::Result;
use keyset_codec::Format;
use keyset_core::{
    EncryptedKeysetWriter, KeyData, KeyMaterialType, KeyStatus, Keyset, KeysetKey,
    OutputPrefixType, SecretBytes,
};
use keyset_storage::{
    atomic_file::FileKeysetWriter, envelope::KeysetEncryptor, key_provider::KeyProvider,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const PROBE_FILE: &str = "health-probe.keyset.json";

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let config = config::load()?;
    match cli.command {
        cli::Command::Write(args) => keysets::handle_write(args, &config).await?,
        cli::Command::Info { manifest } => keysets::handle_info(&manifest)?,
        cli::Command::Health => run_health_check(&config).await?,
        cli::Command::Config(ConfigCommand::Init) => init_config(&config)?,
        cli::Command::Version => print_version(),
    }

    Ok(())
}

fn init_tracing() {
    // Respect user-provided filters, default to info. Logs go to stderr so
    // keysets written to stdout stay clean.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_version() {
    println!("keyset {}", env!("CARGO_PKG_VERSION"));
}

/// Encrypts a probe keyset and writes it through the atomic file path.
async fn run_health_check(config: &config::Config) -> Result<()> {
    let dir = storage::data_dir_from_config(config)?;
    run_write_health(&dir, storage::key_provider_from_config(config)).await?;
    println!("Keyset writer: ok");
    Ok(())
}

async fn run_write_health<P: KeyProvider>(dir: &Path, provider: P) -> Result<()> {
    let encrypted = KeysetEncryptor::new(provider).encrypt(&probe_keyset()).await?;
    let path = dir.join(PROBE_FILE);

    FileKeysetWriter::new(&path, Format::Json).write_encrypted(&encrypted)?;
    let written = fs::read(&path)?;
    fs::remove_file(&path)?;

    if written != Format::Json.encode_encrypted(&encrypted)? {
        color_eyre::eyre::bail!("keyset write round-trip failed");
    }
    Ok(())
}

fn probe_keyset() -> Keyset {
    Keyset::new(
        1,
        vec![KeysetKey {
            key_data: Some(KeyData {
                type_url: "type.googleapis.com/google.crypto.tink.AesGcmKey".into(),
                value: SecretBytes::new(vec![0u8; 32]),
                key_material_type: KeyMaterialType::Symmetric,
            }),
            status: KeyStatus::Enabled,
            key_id: 1,
            output_prefix_type: OutputPrefixType::Tink,
        }],
    )
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}
