use std::path::PathBuf;

use crate::config::Config;
use color_eyre::Result;
use dirs::data_dir;
use keyset_storage::key_provider::KeyringProvider;
use tracing::debug;

const DEFAULT_SERVICE: &str = "keyset-cli";
const DEFAULT_ACCOUNT: &str = "master-key";

/// Resolve the default data directory.
pub fn default_data_dir() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| color_eyre::eyre::eyre!("no data dir available"))?;
    Ok(base.join("keyset"))
}

/// Data directory honouring config overrides.
pub fn data_dir_from_config(config: &Config) -> Result<PathBuf> {
    match &config.data_dir {
        Some(root) => Ok(root.clone()),
        None => default_data_dir(),
    }
}

/// Master key provider backed by the OS keychain.
pub fn key_provider_from_config(config: &Config) -> KeyringProvider {
    let keyring = config.keyring.clone().unwrap_or_default();
    let service = keyring.service.unwrap_or_else(|| DEFAULT_SERVICE.to_string());
    let account = keyring.account.unwrap_or_else(|| DEFAULT_ACCOUNT.to_string());
    debug!(%service, %account, "using keyring master key");
    KeyringProvider::new(service, account)
}
