use std::sync::Arc;

use alloy::network::{EthereumWallet, ReceiptResponse, TransactionBuilder};
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use tracing::debug;
use url::Url;

use swapdesk_core::chain::{ChainClient, ChainConnector, ChainError, TransactionCall, TxReceipt};

use crate::ChainSetupError;

/// One HTTP JSON-RPC endpoint, optionally with a local signing wallet.
#[derive(Clone)]
pub struct AlloyChainClient {
    endpoint: String,
    provider: DynProvider,
    signer: Option<Address>,
}

impl AlloyChainClient {
    pub fn read_only(endpoint: &str) -> Result<Self, ChainSetupError> {
        let url = parse_endpoint(endpoint)?;
        let provider = ProviderBuilder::new().connect_http(url).erased();
        Ok(Self { endpoint: endpoint.to_string(), provider, signer: None })
    }

    pub fn with_signer(endpoint: &str, signer: PrivateKeySigner) -> Result<Self, ChainSetupError> {
        let url = parse_endpoint(endpoint)?;
        let address = signer.address();
        let provider =
            ProviderBuilder::new().wallet(EthereumWallet::from(signer)).connect_http(url).erased();
        Ok(Self { endpoint: endpoint.to_string(), provider, signer: Some(address) })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, ChainSetupError> {
    endpoint.parse::<Url>().map_err(|error| ChainSetupError::InvalidUrl {
        url: endpoint.to_string(),
        reason: error.to_string(),
    })
}

fn rpc_error(error: impl std::fmt::Display) -> ChainError {
    ChainError::Rpc(error.to_string())
}

fn request(call: &TransactionCall) -> TransactionRequest {
    let mut request = TransactionRequest::default()
        .with_to(call.to)
        .with_input(call.data.clone())
        .with_value(call.value);
    if let Some(from) = call.from {
        request = request.with_from(from);
    }
    request
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    async fn block_number(&self) -> Result<u64, ChainError> {
        self.provider.get_block_number().await.map_err(rpc_error)
    }

    async fn call(&self, call: &TransactionCall) -> Result<Bytes, ChainError> {
        self.provider.call(request(call)).await.map_err(rpc_error)
    }

    async fn estimate_gas(&self, call: &TransactionCall) -> Result<u64, ChainError> {
        self.provider.estimate_gas(request(call)).await.map_err(rpc_error)
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        self.provider.get_gas_price().await.map_err(rpc_error)
    }

    async fn send_transaction(&self, call: &TransactionCall) -> Result<TxHash, ChainError> {
        let signer = self.signer.ok_or(ChainError::MissingSigner)?;
        let mut tx = request(call);
        if call.from.is_none() {
            tx = tx.with_from(signer);
        }
        let pending = self.provider.send_transaction(tx).await.map_err(rpc_error)?;
        let tx_hash = *pending.tx_hash();
        debug!(
            event_name = "chain.transaction.broadcast",
            endpoint = %self.endpoint,
            tx_hash = %tx_hash,
            "transaction broadcast"
        );
        Ok(tx_hash)
    }

    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>, ChainError> {
        let receipt = self.provider.get_transaction_receipt(tx_hash).await.map_err(rpc_error)?;
        Ok(receipt.map(|receipt| TxReceipt {
            tx_hash,
            block_number: receipt.block_number(),
            success: receipt.status(),
        }))
    }

    fn signer_address(&self) -> Option<Address> {
        self.signer
    }
}

/// Opens read-only HTTP clients for the quote engine's endpoint loop.
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpChainConnector;

impl ChainConnector for HttpChainConnector {
    fn connect(&self, endpoint: &str) -> Result<Arc<dyn ChainClient>, ChainError> {
        let client = AlloyChainClient::read_only(endpoint)?;
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, Bytes, U256};
    use swapdesk_core::chain::{ChainConnector, ChainError, TransactionCall};

    use super::{request, AlloyChainClient, HttpChainConnector};
    use crate::ChainSetupError;

    #[test]
    fn malformed_endpoints_fail_to_connect() {
        let result = HttpChainConnector.connect("not a url");
        assert!(matches!(result, Err(ChainError::Connect { ref endpoint, .. }) if endpoint == "not a url"));
        assert!(matches!(
            AlloyChainClient::read_only("::"),
            Err(ChainSetupError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn read_only_clients_have_no_signer() {
        let client = AlloyChainClient::read_only("https://rpc.example").expect("client");
        assert_eq!(swapdesk_core::ChainClient::signer_address(&client), None);
        assert_eq!(client.endpoint(), "https://rpc.example");
    }

    #[test]
    fn request_carries_target_calldata_value_and_sender() {
        let router = address!("0x68b3465833fb72A70ecDF485E0e4C7bD8665Fc45");
        let sender = address!("0x1111111111111111111111111111111111111111");
        let call = TransactionCall::new(router, Bytes::from_static(&[1, 2, 3]))
            .with_value(U256::from(7u64))
            .sent_by(sender);

        let tx = request(&call);

        assert_eq!(tx.to, Some(router.into()));
        assert_eq!(tx.from, Some(sender));
        assert_eq!(tx.value, Some(U256::from(7u64)));
        assert_eq!(tx.input.input().cloned(), Some(Bytes::from_static(&[1, 2, 3])));
    }
}
