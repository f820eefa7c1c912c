//! Maker keypair loading.
//!
//! The `KEYPAIR` environment variable (a JSON array of the 64 secret key
//! bytes) wins over the keypair file at the configured wallet path.

use secrecy::{ExposeSecret, SecretString};
use solana_sdk::signature::{read_keypair_file, Keypair};
use std::path::Path;

use crate::types::MakerError;

/// Load the maker keypair from `inline` if set, otherwise from `path`.
pub fn load_keypair(inline: Option<SecretString>, path: &Path) -> Result<Keypair, MakerError> {
    match inline {
        Some(secret) => keypair_from_json(&secret),
        None => read_keypair_file(path).map_err(|e| {
            MakerError::Config(format!("cannot read keypair file {}: {e}", path.display()))
        }),
    }
}

fn keypair_from_json(secret: &SecretString) -> Result<Keypair, MakerError> {
    let bytes: Vec<u8> = serde_json::from_str(secret.expose_secret())
        .map_err(|_| MakerError::Config("KEYPAIR is not a JSON byte array".to_string()))?;
    Keypair::from_bytes(&bytes)
        .map_err(|_| MakerError::Config(format!("KEYPAIR holds {} bytes, not a keypair", bytes.len())))
}
