//! The narrow slice of a blockchain RPC client the swap flow depends on.
//!
//! Contract encoding lives in [`abi`]; implementations only move bytes.

pub mod abi;
pub mod scripted;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("could not connect to rpc endpoint `{endpoint}`: {reason}")]
    Connect { endpoint: String, reason: String },
    #[error("rpc request failed: {0}")]
    Rpc(String),
    #[error("rpc request `{operation}` timed out after {after:?}")]
    Timeout { operation: &'static str, after: Duration },
    #[error("could not decode contract response: {0}")]
    Decode(String),
    #[error("no signer is configured for this client")]
    MissingSigner,
}

/// Call or transaction payload in chain-native types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionCall {
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl TransactionCall {
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self { from: None, to, data: data.into(), value: U256::ZERO }
    }

    pub fn sent_by(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub success: bool,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn block_number(&self) -> Result<u64, ChainError>;
    /// Static call; state changes are discarded.
    async fn call(&self, call: &TransactionCall) -> Result<Bytes, ChainError>;
    async fn estimate_gas(&self, call: &TransactionCall) -> Result<u64, ChainError>;
    /// Current gas price in wei.
    async fn gas_price(&self) -> Result<u128, ChainError>;
    /// Signs with the client's own key and broadcasts.
    async fn send_transaction(&self, call: &TransactionCall) -> Result<TxHash, ChainError>;
    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>, ChainError>;
    fn signer_address(&self) -> Option<Address>;
}

/// Opens read-only clients for the quote engine's endpoint fallback loop.
pub trait ChainConnector: Send + Sync {
    fn connect(&self, endpoint: &str) -> Result<Arc<dyn ChainClient>, ChainError>;
}

/// Bounds one RPC round-trip so a hung endpoint cannot stall the caller.
pub async fn with_timeout<T, F>(
    operation: &'static str,
    after: Duration,
    future: F,
) -> Result<T, ChainError>
where
    F: Future<Output = Result<T, ChainError>>,
{
    match tokio::time::timeout(after, future).await {
        Ok(result) => result,
        Err(_) => Err(ChainError::Timeout { operation, after }),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{with_timeout, ChainError};

    #[tokio::test]
    async fn slow_calls_turn_into_timeouts() {
        let result: Result<u64, ChainError> =
            with_timeout("block_number", Duration::from_millis(10), async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(1)
            })
            .await;

        assert!(matches!(result, Err(ChainError::Timeout { operation: "block_number", .. })));
    }

    #[tokio::test]
    async fn fast_calls_pass_through() {
        let result = with_timeout("block_number", Duration::from_secs(1), async { Ok(7u64) }).await;
        assert_eq!(result, Ok(7));
    }
}
