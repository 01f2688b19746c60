//! Turns a quote plus a slippage tolerance into an unsigned router transaction.
//!
//! Two entry points, never mixed:
//! - [`SwapBuilder::build_fresh`] re-runs the quote engine (hosted signing page).
//! - [`SwapBuilder::build_from_quote`] reuses the raw quote the user already saw
//!   (custodial execution) and performs no RPC at all.

use std::time::Duration;

use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::chain::abi::{self, ExactInputSingle, ROUTER_MSG_SENDER, SWAP_ROUTER_02};
use crate::chain::TransactionCall;
use crate::domain::swap::{Quote, SwapRequest};
use crate::domain::token::TokenRegistry;
use crate::errors::{DomainError, SwapError};
use crate::swap::quote::{GasHint, QuoteEngine};
use crate::units::{format_units, parse_units};

pub const DEADLINE_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Who receives the swap output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recipient {
    /// Custodial execution pays the signing wallet.
    Signer(Address),
    /// Client-side signing pays whoever sends the transaction.
    Caller,
}

impl Recipient {
    pub fn address(self) -> Address {
        match self {
            Self::Signer(address) => address,
            Self::Caller => ROUTER_MSG_SENDER,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuiltSwap {
    pub chain_id: u64,
    pub transaction: TransactionCall,
    pub amount_in: U256,
    pub min_amount_out: U256,
    pub amount_out_human: String,
    pub min_amount_out_human: String,
    pub deadline: u64,
    pub gas_hint: Option<GasHint>,
}

/// `floor(raw * (100 - floor(slippage)) / 100)` in integer arithmetic.
pub fn min_amount_out(raw_amount_out: U256, slippage_percent: Decimal) -> Result<U256, SwapError> {
    let whole = slippage_percent.floor();
    if whole < Decimal::ZERO || whole > Decimal::ONE_HUNDRED {
        return Err(DomainError::InvalidSlippage(slippage_percent.to_string()).into());
    }
    let kept = whole
        .to_u64()
        .map(|whole| 100 - whole)
        .ok_or_else(|| DomainError::InvalidSlippage(slippage_percent.to_string()))?;

    raw_amount_out
        .checked_mul(U256::from(kept))
        .map(|scaled| scaled / U256::from(100u64))
        .ok_or_else(|| SwapError::InvalidQuote("amountOut overflows minimum-output math".into()))
}

/// Basis points as a percentage, e.g. `150` -> `1.5`.
pub fn slippage_percent_from_bps(slippage_bps: u32) -> Decimal {
    Decimal::new(i64::from(slippage_bps), 2)
}

#[derive(Clone, Debug)]
pub struct SwapBuilder {
    router: Address,
    registry: TokenRegistry,
    deadline_window: Duration,
}

impl Default for SwapBuilder {
    fn default() -> Self {
        Self::new(TokenRegistry::mainnet())
    }
}

impl SwapBuilder {
    pub fn new(registry: TokenRegistry) -> Self {
        Self { router: SWAP_ROUTER_02, registry, deadline_window: DEADLINE_WINDOW }
    }

    pub fn router(&self) -> Address {
        self.router
    }

    pub fn build_from_quote(
        &self,
        quote: &Quote,
        slippage_percent: Decimal,
        recipient: Recipient,
    ) -> Result<BuiltSwap, SwapError> {
        self.build_from_quote_at(quote, slippage_percent, recipient, Utc::now())
    }

    pub fn build_from_quote_at(
        &self,
        quote: &Quote,
        slippage_percent: Decimal,
        recipient: Recipient,
        now: DateTime<Utc>,
    ) -> Result<BuiltSwap, SwapError> {
        let request = &quote.request;
        let raw_amount_out = quote.raw.amount_out;
        if raw_amount_out.is_zero() {
            return Err(SwapError::InvalidQuote("amountOut is 0".into()));
        }

        let amount_in = parse_units(&request.amount_in, self.registry.decimals(request.token_in))?;
        let min_out = min_amount_out(raw_amount_out, slippage_percent)?;
        // Past the deadline the router's multicall reverts on-chain.
        let deadline = u64::try_from(now.timestamp()).unwrap_or_default()
            + self.deadline_window.as_secs();

        let data = abi::swap_exact_input_single(
            ExactInputSingle {
                token_in: request.token_in,
                token_out: request.token_out,
                fee: quote.raw.fee_tier,
                recipient: recipient.address(),
                amount_in,
                amount_out_minimum: min_out,
            },
            U256::from(deadline),
        );

        let mut transaction = TransactionCall::new(self.router, data);
        match recipient {
            Recipient::Signer(signer) => transaction = transaction.sent_by(signer),
            // A wallet pays native ETH and the router wraps it.
            Recipient::Caller if request.token_in == self.registry.wrapped_native() => {
                transaction = transaction.with_value(amount_in);
            }
            Recipient::Caller => {}
        }

        let decimals_out = self.registry.decimals(request.token_out);
        Ok(BuiltSwap {
            chain_id: request.chain_id,
            transaction,
            amount_in,
            min_amount_out: min_out,
            amount_out_human: format_units(raw_amount_out, decimals_out),
            min_amount_out_human: format_units(min_out, decimals_out),
            deadline,
            gas_hint: None,
        })
    }

    /// Fresh quote, slippage taken from the request's basis points, plus a gas hint.
    pub async fn build_fresh(
        &self,
        engine: &QuoteEngine,
        request: &SwapRequest,
        recipient: Recipient,
    ) -> Result<BuiltSwap, SwapError> {
        let quote = engine.try_quote(request).await?;
        let slippage_percent = slippage_percent_from_bps(request.slippage_bps);
        let mut built = self.build_from_quote(&quote, slippage_percent, recipient)?;
        built.gas_hint = engine.gas_hint(&built.transaction).await;
        Ok(built)
    }
}
