use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use keyset_codec::Format;

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "keyset",
    about = "Write keysets and encrypted keysets to files or stdout",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Serialize the keyset described by a manifest.
    Write(WriteArgs),
    /// Show key ids, status and type urls from a manifest (never key material).
    Info {
        #[arg(long)]
        manifest: PathBuf,
    },
    /// Encrypt and write a probe keyset under the data directory.
    Health,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version and exit.
    Version,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct WriteArgs {
    /// TOML manifest describing the keyset.
    #[arg(long)]
    pub manifest: PathBuf,
    /// Destination file, replaced atomically. Writes to stdout when absent.
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Output format (json or binary); falls back to the configured default.
    #[arg(long)]
    pub format: Option<Format>,
    /// Encrypt under the keyring master key before writing.
    #[arg(long)]
    pub encrypt: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}
