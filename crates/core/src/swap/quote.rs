//! Best-price discovery across fee tiers and RPC endpoints.
//!
//! Every RPC attempt is folded into a [`TierAttempt`] or [`EndpointAttempt`]
//! value; nothing a provider does escapes as an error. Only total exhaustion
//! becomes [`SwapError::NoRouteAvailable`] (or `None` from [`QuoteEngine::get_quote`]).

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::chain::abi::{self, QUOTER_V2};
use crate::chain::{with_timeout, ChainClient, ChainConnector, ChainError, TransactionCall};
use crate::config::ChainConfig;
use crate::domain::swap::{FeeTier, Quote, QuoteSummary, RawQuote, SwapRequest};
use crate::domain::token::TokenRegistry;
use crate::errors::{DomainError, SwapError};
use crate::units::{format_units, parse_units, to_decimal};

const PRICE_DECIMAL_PLACES: u32 = 8;

/// Gas annotation for a built transaction. Display-only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasHint {
    pub gas_units: Option<u64>,
    pub gas_price_wei: Option<u128>,
}

impl GasHint {
    pub fn gas_price_gwei(&self) -> Option<Decimal> {
        self.gas_price_wei.and_then(gwei)
    }
}

#[derive(Debug)]
enum TierAttempt {
    Found(U256),
    Empty,
    Failed(ChainError),
}

enum EndpointAttempt {
    Quoted { client: Arc<dyn ChainClient>, raw: RawQuote },
    Exhausted,
    Unreachable(ChainError),
}

pub struct QuoteEngine {
    connector: Arc<dyn ChainConnector>,
    endpoints: Vec<String>,
    registry: TokenRegistry,
    rpc_timeout: Duration,
    quoter: Address,
}

impl QuoteEngine {
    pub fn new(
        connector: Arc<dyn ChainConnector>,
        endpoints: Vec<String>,
        rpc_timeout: Duration,
    ) -> Self {
        Self {
            connector,
            endpoints,
            registry: TokenRegistry::mainnet(),
            rpc_timeout,
            quoter: QUOTER_V2,
        }
    }

    pub fn from_config(connector: Arc<dyn ChainConnector>, config: &ChainConfig) -> Self {
        Self::new(connector, config.endpoints(), config.rpc_timeout())
    }

    pub fn with_registry(mut self, registry: TokenRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// `None` when no endpoint/tier combination produced a non-zero output.
    pub async fn get_quote(&self, request: &SwapRequest) -> Option<Quote> {
        self.try_quote(request).await.ok()
    }

    /// Same search as [`Self::get_quote`], keeping the reason for a miss.
    ///
    /// Malformed amounts fail before any RPC traffic.
    pub async fn try_quote(&self, request: &SwapRequest) -> Result<Quote, SwapError> {
        let decimals_in = self.registry.decimals(request.token_in);
        let amount_in = parse_units(&request.amount_in, decimals_in)?;
        if amount_in.is_zero() {
            return Err(DomainError::InvalidAmount {
                value: request.amount_in.clone(),
                reason: "amount must be greater than zero",
            }
            .into());
        }

        for endpoint in &self.endpoints {
            match self.quote_on_endpoint(endpoint, request, amount_in).await {
                EndpointAttempt::Quoted { client, raw } => {
                    let gas_price =
                        with_timeout("gas_price", self.rpc_timeout, client.gas_price()).await.ok();
                    let summary = self.summarize(request, raw, gas_price);
                    info!(
                        event_name = "swap.quote.selected",
                        endpoint = %endpoint,
                        token_in = %request.token_in,
                        token_out = %request.token_out,
                        fee_tier = raw.fee_tier.pips(),
                        amount_out = %raw.amount_out,
                        "quote selected"
                    );
                    return Ok(Quote { request: request.clone(), summary, raw });
                }
                EndpointAttempt::Exhausted => {
                    debug!(
                        event_name = "swap.quote.endpoint_exhausted",
                        endpoint = %endpoint,
                        "no fee tier produced output on endpoint"
                    );
                }
                EndpointAttempt::Unreachable(error) => {
                    warn!(
                        event_name = "swap.quote.endpoint_unreachable",
                        endpoint = %endpoint,
                        error = %error,
                        "skipping rpc endpoint"
                    );
                }
            }
        }

        warn!(
            event_name = "swap.quote.no_route",
            token_in = %request.token_in,
            token_out = %request.token_out,
            amount_in = %request.amount_in,
            endpoints = self.endpoints.len(),
            "no route or quote available"
        );
        Err(SwapError::NoRouteAvailable)
    }

    /// Estimates gas for `call` on the first endpoint that answers.
    pub async fn gas_hint(&self, call: &TransactionCall) -> Option<GasHint> {
        for endpoint in &self.endpoints {
            let Ok(client) = self.connector.connect(endpoint) else {
                continue;
            };
            let gas_units =
                with_timeout("estimate_gas", self.rpc_timeout, client.estimate_gas(call)).await;
            let gas_price = with_timeout("gas_price", self.rpc_timeout, client.gas_price()).await;
            if let Err(error) = &gas_units {
                debug!(
                    event_name = "swap.quote.gas_estimate_failed",
                    endpoint = %endpoint,
                    error = %error,
                    "gas estimate unavailable"
                );
            }
            if gas_units.is_ok() || gas_price.is_ok() {
                return Some(GasHint { gas_units: gas_units.ok(), gas_price_wei: gas_price.ok() });
            }
        }
        None
    }

    async fn quote_on_endpoint(
        &self,
        endpoint: &str,
        request: &SwapRequest,
        amount_in: U256,
    ) -> EndpointAttempt {
        let client = match self.connector.connect(endpoint) {
            Ok(client) => client,
            Err(error) => return EndpointAttempt::Unreachable(error),
        };

        // A node that refuses eth_blockNumber may still serve eth_call.
        if let Err(error) =
            with_timeout("block_number", self.rpc_timeout, client.block_number()).await
        {
            debug!(
                event_name = "swap.quote.block_probe_failed",
                endpoint = %endpoint,
                error = %error,
                "liveness probe failed; quoting anyway"
            );
        }

        let mut best: Option<RawQuote> = None;
        for fee_tier in FeeTier::ALL {
            match self.quote_tier(client.as_ref(), request, fee_tier, amount_in).await {
                TierAttempt::Found(amount_out) => {
                    if best.map_or(true, |current| amount_out > current.amount_out) {
                        best = Some(RawQuote { fee_tier, amount_out });
                    }
                }
                TierAttempt::Empty => {}
                TierAttempt::Failed(error) => {
                    debug!(
                        event_name = "swap.quote.tier_failed",
                        endpoint = %endpoint,
                        fee_tier = fee_tier.pips(),
                        error = %error,
                        "fee tier produced no quote"
                    );
                }
            }
        }

        match best {
            Some(raw) => EndpointAttempt::Quoted { client, raw },
            None => EndpointAttempt::Exhausted,
        }
    }

    async fn quote_tier(
        &self,
        client: &dyn ChainClient,
        request: &SwapRequest,
        fee_tier: FeeTier,
        amount_in: U256,
    ) -> TierAttempt {
        let single = TransactionCall::new(
            self.quoter,
            abi::quote_exact_input_single(request.token_in, request.token_out, fee_tier, amount_in),
        );
        let single_result = with_timeout("quote_exact_input_single", self.rpc_timeout, async {
            let data = client.call(&single).await?;
            abi::decode_quote_exact_input_single(&data)
        })
        .await;
        if let Ok(amount_out) = single_result {
            return found_or_empty(amount_out);
        }

        let path = abi::single_pool_path(request.token_in, fee_tier, request.token_out);
        let by_path = TransactionCall::new(self.quoter, abi::quote_exact_input(path, amount_in));
        let path_result = with_timeout("quote_exact_input", self.rpc_timeout, async {
            let data = client.call(&by_path).await?;
            abi::decode_quote_exact_input(&data)
        })
        .await;
        match path_result {
            Ok(amount_out) => found_or_empty(amount_out),
            Err(error) => TierAttempt::Failed(error),
        }
    }

    fn summarize(&self, request: &SwapRequest, raw: RawQuote, gas_price: Option<u128>) -> QuoteSummary {
        let decimals_in = self.registry.decimals(request.token_in);
        let decimals_out = self.registry.decimals(request.token_out);
        let amount_out = format_units(raw.amount_out, decimals_out);

        let execution_price = parse_units(&request.amount_in, decimals_in)
            .ok()
            .and_then(|amount_in| to_decimal(amount_in, decimals_in))
            .zip(to_decimal(raw.amount_out, decimals_out))
            .and_then(|(amount_in, amount_out)| amount_out.checked_div(amount_in))
            .map(|price| price.round_dp(PRICE_DECIMAL_PLACES).normalize().to_string())
            .unwrap_or_else(|| "n/a".to_string());

        QuoteSummary {
            token_in_symbol: self.registry.display_symbol(request.token_in),
            token_out_symbol: self.registry.display_symbol(request.token_out),
            amount_out,
            execution_price,
            fee_summary: fee_summary(gas_price),
        }
    }
}

fn found_or_empty(amount_out: U256) -> TierAttempt {
    if amount_out.is_zero() {
        TierAttempt::Empty
    } else {
        TierAttempt::Found(amount_out)
    }
}

/// Wei expressed in gwei.
pub fn gwei(wei: u128) -> Option<Decimal> {
    let wei = i128::try_from(wei).ok()?;
    Decimal::try_from_i128_with_scale(wei, 9).ok()
}

pub fn fee_summary(gas_price_wei: Option<u128>) -> String {
    match gas_price_wei.and_then(gwei) {
        Some(gwei) => format!("gasPrice≈{gwei:.2} gwei"),
        None => "n/a".to_string(),
    }
}
