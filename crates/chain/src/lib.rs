//! JSON-RPC implementation of the `swapdesk-core` chain seam, built on alloy.

pub mod client;
pub mod signer;

use std::sync::Arc;

use swapdesk_core::config::AppConfig;
use swapdesk_core::{ChainClient, ChainError};
use thiserror::Error;

pub use client::{AlloyChainClient, HttpChainConnector};
pub use signer::load_signer;

#[derive(Debug, Error)]
pub enum ChainSetupError {
    #[error("invalid rpc url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid wallet private key: {0}")]
    InvalidPrivateKey(String),
}

impl From<ChainSetupError> for ChainError {
    fn from(error: ChainSetupError) -> Self {
        match error {
            ChainSetupError::InvalidUrl { url, reason } => {
                ChainError::Connect { endpoint: url, reason }
            }
            ChainSetupError::InvalidPrivateKey(_) => ChainError::MissingSigner,
        }
    }
}

/// Signing client on the primary endpoint, when custodial execution is enabled.
pub fn custodial_client(config: &AppConfig) -> Result<Option<Arc<dyn ChainClient>>, ChainSetupError> {
    if !config.wallet.custodial_execution_enabled() {
        return Ok(None);
    }
    let Some(private_key) = &config.wallet.private_key else {
        return Ok(None);
    };
    let signer = load_signer(private_key)?;
    let client = AlloyChainClient::with_signer(&config.chain.rpc_url, signer)?;
    Ok(Some(Arc::new(client)))
}
