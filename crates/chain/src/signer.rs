use alloy::signers::local::PrivateKeySigner;
use secrecy::{ExposeSecret, SecretString};

use crate::ChainSetupError;

/// Parses a hex private key, with or without `0x`. The key never reaches an error message.
pub fn load_signer(private_key: &SecretString) -> Result<PrivateKeySigner, ChainSetupError> {
    let key = private_key.expose_secret().trim();
    key.strip_prefix("0x")
        .unwrap_or(key)
        .parse::<PrivateKeySigner>()
        .map_err(|_| ChainSetupError::InvalidPrivateKey("expected 32 bytes of hex".to_string()))
}
