//! Custodial execution: wrap, approve, swap, wait.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, TxHash, U256};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::chain::abi;
use crate::chain::{with_timeout, ChainClient, ChainError, TransactionCall, TxReceipt};
use crate::config::ChainConfig;
use crate::domain::swap::Quote;
use crate::domain::token::TokenRegistry;
use crate::errors::SwapError;
use crate::swap::builder::{Recipient, SwapBuilder};
use crate::units::parse_units;

/// Bounded receipt polling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl ConfirmationPolicy {
    pub fn from_config(config: &ChainConfig) -> Self {
        Self {
            poll_interval: config.confirmation_poll_interval(),
            max_polls: config.confirmation_max_polls,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub min_amount_out: U256,
}

pub struct SwapExecutor {
    client: Arc<dyn ChainClient>,
    signer: Address,
    builder: SwapBuilder,
    registry: TokenRegistry,
    confirmation: ConfirmationPolicy,
    rpc_timeout: Duration,
    // One in-flight execution per signer keeps nonces ordered.
    signer_lock: Mutex<()>,
}

impl SwapExecutor {
    pub fn new(
        client: Arc<dyn ChainClient>,
        confirmation: ConfirmationPolicy,
        rpc_timeout: Duration,
    ) -> Result<Self, SwapError> {
        let signer = client.signer_address().ok_or(ChainError::MissingSigner)?;
        let registry = TokenRegistry::mainnet();
        Ok(Self {
            client,
            signer,
            builder: SwapBuilder::new(registry.clone()),
            registry,
            confirmation,
            rpc_timeout,
            signer_lock: Mutex::new(()),
        })
    }

    pub fn signer(&self) -> Address {
        self.signer
    }

    /// Executes `quote` exactly as priced; never re-quotes.
    pub async fn execute(
        &self,
        quote: &Quote,
        slippage_percent: u8,
    ) -> Result<ExecutionReceipt, SwapError> {
        let _guard = self.signer_lock.lock().await;
        let token_in = quote.request.token_in;
        let amount_in = parse_units(&quote.request.amount_in, self.registry.decimals(token_in))?;

        if token_in == self.registry.wrapped_native() {
            self.ensure_wrapped_balance(token_in, amount_in).await?;
        }
        self.ensure_allowance(token_in, amount_in).await?;

        let built = self.builder.build_from_quote(
            quote,
            Decimal::from(slippage_percent),
            Recipient::Signer(self.signer),
        )?;
        let tx_hash = self.send(&built.transaction).await?;
        info!(
            event_name = "swap.execute.swap_submitted",
            tx_hash = %tx_hash,
            signer = %self.signer,
            min_amount_out = %built.min_amount_out,
            "swap transaction submitted"
        );

        match self.wait_for_receipt(tx_hash).await {
            Some(receipt) if receipt.success => Ok(ExecutionReceipt {
                tx_hash,
                block_number: receipt.block_number,
                min_amount_out: built.min_amount_out,
            }),
            Some(_) => Err(SwapError::TransactionReverted { tx_hash: tx_hash.to_string() }),
            None => {
                warn!(
                    event_name = "swap.execute.not_mined",
                    tx_hash = %tx_hash,
                    max_polls = self.confirmation.max_polls,
                    "confirmation wait exhausted"
                );
                Err(SwapError::TransactionNotMined { tx_hash: tx_hash.to_string() })
            }
        }
    }

    /// Wraps only the shortfall between the WETH balance and `required`.
    async fn ensure_wrapped_balance(&self, weth: Address, required: U256) -> Result<(), SwapError> {
        let balance = self.read_uint(weth, abi::erc20_balance_of(self.signer)).await?;
        if balance >= required {
            return Ok(());
        }

        let shortfall = required - balance;
        let wrap = TransactionCall::new(weth, abi::weth_deposit())
            .sent_by(self.signer)
            .with_value(shortfall);
        info!(
            event_name = "swap.execute.wrap_submitted",
            balance = %balance,
            shortfall = %shortfall,
            "wrapping native balance shortfall"
        );
        self.submit_and_confirm(&wrap, "wrap").await.map_err(|reason| {
            SwapError::InsufficientAllowanceOrBalance { reason }
        })
    }

    async fn ensure_allowance(&self, token: Address, required: U256) -> Result<(), SwapError> {
        let spender = self.builder.router();
        let allowance = self.read_uint(token, abi::erc20_allowance(self.signer, spender)).await?;
        if allowance >= required {
            return Ok(());
        }

        let approve = |value: U256| {
            TransactionCall::new(token, abi::erc20_approve(spender, value)).sent_by(self.signer)
        };
        info!(
            event_name = "swap.execute.approve_submitted",
            token = %token,
            allowance = %allowance,
            required = %required,
            "approving router allowance"
        );
        let Err(first) = self.submit_and_confirm(&approve(required), "approve").await else {
            return Ok(());
        };

        // Tokens like USDT refuse to move a non-zero allowance to another non-zero value.
        warn!(
            event_name = "swap.execute.approve_retry",
            token = %token,
            error = %first,
            "approve failed; resetting allowance to zero first"
        );
        self.submit_and_confirm(&approve(U256::ZERO), "approve reset").await.map_err(|reason| {
            SwapError::InsufficientAllowanceOrBalance { reason }
        })?;
        self.submit_and_confirm(&approve(required), "approve").await.map_err(|reason| {
            SwapError::InsufficientAllowanceOrBalance { reason }
        })
    }

    /// Ok once the transaction is mined successfully; the error is a user-facing reason.
    async fn submit_and_confirm(&self, call: &TransactionCall, step: &str) -> Result<(), String> {
        let tx_hash = self.send(call).await.map_err(|error| format!("{step} failed: {error}"))?;
        match self.wait_for_receipt(tx_hash).await {
            Some(receipt) if receipt.success => Ok(()),
            Some(_) => Err(format!("{step} transaction {tx_hash} reverted")),
            None => Err(format!("{step} transaction {tx_hash} was not confirmed in time")),
        }
    }

    async fn send(&self, call: &TransactionCall) -> Result<TxHash, ChainError> {
        with_timeout("send_transaction", self.rpc_timeout, self.client.send_transaction(call)).await
    }

    async fn read_uint(&self, token: Address, data: Bytes) -> Result<U256, ChainError> {
        let call = TransactionCall::new(token, data);
        with_timeout("eth_call", self.rpc_timeout, async {
            let output = self.client.call(&call).await?;
            abi::decode_uint256(&output)
        })
        .await
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Option<TxReceipt> {
        for poll in 0..self.confirmation.max_polls {
            let lookup = with_timeout(
                "transaction_receipt",
                self.rpc_timeout,
                self.client.transaction_receipt(tx_hash),
            )
            .await;
            match lookup {
                Ok(Some(receipt)) => return Some(receipt),
                Ok(None) => {}
                Err(error) => debug!(
                    event_name = "swap.execute.receipt_poll_failed",
                    tx_hash = %tx_hash,
                    poll,
                    error = %error,
                    "receipt lookup failed"
                ),
            }
            tokio::time::sleep(self.confirmation.poll_interval).await;
        }
        None
    }
}
