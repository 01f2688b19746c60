use std::sync::Arc;

use rust_decimal::Decimal;
use swapdesk_chain::HttpChainConnector;
use swapdesk_core::chain::ChainConnector;
use swapdesk_core::config::{AppConfig, LoadOptions};
use swapdesk_core::domain::session::{slippage_bps, MAX_SLIPPAGE_PERCENT};
use swapdesk_core::swap::{min_amount_out, QuoteEngine};
use swapdesk_core::units::format_units;
use swapdesk_core::SwapRequest;

use crate::commands::CommandResult;

#[derive(Clone, Debug)]
pub struct QuoteArgs {
    pub amount: String,
    pub base: String,
    pub quote: String,
    pub slippage: u8,
}

pub fn run(options: LoadOptions, args: &QuoteArgs) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "quote",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "quote",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    runtime.block_on(quote_with(&config, Arc::new(HttpChainConnector), args))
}

pub async fn quote_with(
    config: &AppConfig,
    connector: Arc<dyn ChainConnector>,
    args: &QuoteArgs,
) -> CommandResult {
    if !(1..=MAX_SLIPPAGE_PERCENT).contains(&args.slippage) {
        return CommandResult::failure(
            "quote",
            "invalid_input",
            format!("slippage must be between 1 and {MAX_SLIPPAGE_PERCENT} percent"),
            2,
        );
    }

    let engine = QuoteEngine::from_config(connector, &config.chain);
    let registry = engine.registry();
    let Some(pair) = registry.resolve_pair(&args.base, &args.quote) else {
        return CommandResult::failure(
            "quote",
            "unsupported_pair",
            format!("cannot resolve {}/{} on chain {}", args.base, args.quote, config.chain.chain_id),
            2,
        );
    };

    let request = SwapRequest {
        chain_id: config.chain.chain_id,
        token_in: pair.token_in.address,
        token_out: pair.token_out.address,
        amount_in: args.amount.trim().to_string(),
        slippage_bps: slippage_bps(args.slippage),
    };

    let quote = match engine.try_quote(&request).await {
        Ok(quote) => quote,
        Err(error) => return CommandResult::failure("quote", "no_quote", error.user_message(), 6),
    };

    let min_out = match min_amount_out(quote.raw.amount_out, Decimal::from(args.slippage)) {
        Ok(min_out) => format_units(min_out, registry.decimals(request.token_out)),
        Err(error) => return CommandResult::failure("quote", "invalid_quote", error.user_message(), 6),
    };

    let summary = &quote.summary;
    CommandResult::success(
        "quote",
        format!(
            "{amount} {token_in} → {token_out} | rate {rate} | est. receive {out} {token_out} | \
             min. receive {min_out} {token_out} at {slippage}% | fee tier {tier} | {fee}",
            amount = request.amount_in,
            token_in = summary.token_in_symbol,
            token_out = summary.token_out_symbol,
            rate = summary.execution_price,
            out = summary.amount_out,
            slippage = args.slippage,
            tier = quote.raw.fee_tier.pips(),
            fee = summary.fee_summary,
        ),
    )
}
