//! Destinations and upstream collaborators for keyset writing: atomic file
//! output, async secret stores, master keys, and envelope encryption.

pub mod atomic_file;
pub mod envelope;
pub mod key_provider;
pub mod secret_store;
