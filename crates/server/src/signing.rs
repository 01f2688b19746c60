//! Hosted signing: a wallet-extension confirmation page and the JSON endpoint
//! it calls to build an unsigned swap for the connected wallet.

use std::str::FromStr;
use std::sync::Arc;

use alloy_primitives::Address;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use swapdesk_core::domain::session::DEFAULT_SLIPPAGE_PERCENT;
use swapdesk_core::domain::token::short_address;
use swapdesk_core::errors::InterfaceError;
use swapdesk_core::swap::{BuiltSwap, GasHint, QuoteEngine, Recipient, SwapBuilder};
use swapdesk_core::SwapRequest;
use tera::{Context, Tera};
use tracing::{info, warn};
use uuid::Uuid;

const SIGN_SWAP_TEMPLATE: &str = "sign/swap.html";
const MAX_SLIPPAGE_BPS: u32 = 10_000;
const UNAVAILABLE: &str = "—";

#[derive(Clone)]
pub struct SigningState {
    pub quotes: Arc<QuoteEngine>,
    pub builder: SwapBuilder,
    pub templates: Arc<Tera>,
    pub chain_id: u64,
    pub explorer_tx_url: String,
}

impl SigningState {
    pub fn new(quotes: Arc<QuoteEngine>, chain_id: u64, explorer_tx_url: String) -> Self {
        let builder = SwapBuilder::new(quotes.registry().clone());
        Self { quotes, builder, templates: init_templates(), chain_id, explorer_tx_url }
    }

    fn swap_request(&self, params: &SwapParams) -> Result<SwapRequest, String> {
        let chain_id = params.chain_id.unwrap_or(self.chain_id);
        if chain_id != self.chain_id {
            return Err(format!("unsupported chain {chain_id}; this service signs on chain {}", self.chain_id));
        }
        let token_in = parse_address("tokenIn", params.token_in.as_deref())?;
        let token_out = parse_address("tokenOut", params.token_out.as_deref())?;
        let amount_in = params.amount_in.as_deref().map(str::trim).unwrap_or_default();
        if amount_in.is_empty() {
            return Err("amountIn is required".to_string());
        }
        let slippage_bps = params.slippage_bps.unwrap_or(u32::from(DEFAULT_SLIPPAGE_PERCENT) * 100);
        if slippage_bps > MAX_SLIPPAGE_BPS {
            return Err(format!("slippageBps must be at most {MAX_SLIPPAGE_BPS}"));
        }
        Ok(SwapRequest { chain_id, token_in, token_out, amount_in: amount_in.to_string(), slippage_bps })
    }
}

fn init_templates() -> Arc<Tera> {
    let mut tera = Tera::default();
    if let Err(error) =
        tera.add_raw_template(SIGN_SWAP_TEMPLATE, include_str!("../../../templates/sign/swap.html"))
    {
        warn!(error = %error, "failed to register signing page template");
    }
    Arc::new(tera)
}

fn parse_address(field: &str, value: Option<&str>) -> Result<Address, String> {
    let raw = value.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(format!("{field} is required"));
    }
    Address::from_str(raw).map_err(|_| format!("{field} is not a valid address"))
}

/// Shared by the page query string and the JSON body.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapParams {
    pub chain_id: Option<u64>,
    pub token_in: Option<String>,
    pub token_out: Option<String>,
    pub amount_in: Option<String>,
    pub slippage_bps: Option<u32>,
    /// Informational; the router pays whoever sends the transaction.
    pub recipient: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequestBody {
    pub to: String,
    pub data: String,
    pub value: String,
    pub chain_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSwapUi {
    pub amount_out_human: String,
    pub min_out_human: String,
    pub amount_in_raw: String,
    pub gas_units: Option<String>,
    pub gas_price_gwei: Option<String>,
    pub fee_estimate_eth: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSwapResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx: Option<TransactionRequestBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui: Option<BuildSwapUi>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl BuildSwapResponse {
    fn built(swap: &BuiltSwap) -> Self {
        let gas = swap.gas_hint;
        Self {
            ok: true,
            tx: Some(TransactionRequestBody {
                to: swap.transaction.to.to_checksum(None),
                data: swap.transaction.data.to_string(),
                value: format!("{:#x}", swap.transaction.value),
                chain_id: format!("{:#x}", swap.chain_id),
            }),
            ui: Some(BuildSwapUi {
                amount_out_human: swap.amount_out_human.clone(),
                min_out_human: swap.min_amount_out_human.clone(),
                amount_in_raw: swap.amount_in.to_string(),
                gas_units: gas.and_then(|hint| hint.gas_units).map(|units| units.to_string()),
                gas_price_gwei: gas
                    .and_then(|hint| hint.gas_price_gwei())
                    .map(|gwei| gwei.round_dp(2).normalize().to_string()),
                fee_estimate_eth: gas.and_then(fee_estimate_eth),
            }),
            error: None,
            correlation_id: None,
        }
    }

    fn rejected(error: &InterfaceError) -> Self {
        let message = match error {
            InterfaceError::BadRequest { message, .. }
            | InterfaceError::ServiceUnavailable { message, .. }
            | InterfaceError::Internal { message, .. } => message.clone(),
        };
        Self {
            ok: false,
            tx: None,
            ui: None,
            error: Some(message),
            correlation_id: Some(error.correlation_id().to_string()),
        }
    }
}

/// `gasUnits * gasPrice` in ETH, six decimal places.
fn fee_estimate_eth(hint: GasHint) -> Option<String> {
    let units = Decimal::from(hint.gas_units?);
    let gwei = hint.gas_price_gwei()?;
    let eth = units.checked_mul(gwei)? / Decimal::from(1_000_000_000u64);
    Some(eth.round_dp(6).normalize().to_string())
}

pub fn router(state: SigningState) -> Router {
    Router::new()
        .route("/sign/swap", get(sign_swap_page))
        .route("/sign/buildSwap", post(build_swap))
        .with_state(state)
}

pub async fn sign_swap_page(
    State(state): State<SigningState>,
    Query(params): Query<SwapParams>,
) -> Result<impl IntoResponse, (StatusCode, Html<String>)> {
    let request = state.swap_request(&params).map_err(|error| {
        (StatusCode::BAD_REQUEST, Html(format!("<h1>Invalid swap link</h1><p>{}</p>", escape(&error))))
    })?;

    // Prefill so the page matches the chat quote before a wallet connects.
    let prefill = match state.builder.build_fresh(&state.quotes, &request, Recipient::Caller).await {
        Ok(built) => Some(built),
        Err(error) => {
            info!(event_name = "http.sign.prefill_failed", error = %error, "signing page prefill failed");
            None
        }
    };

    let registry = state.quotes.registry();
    let mut context = Context::new();
    context.insert(
        "network_label",
        &if request.chain_id == 1 { "Ethereum Mainnet".to_string() } else { format!("Chain {}", request.chain_id) },
    );
    context.insert("token_in_short", &short_address(request.token_in));
    context.insert("token_in_symbol", &registry.display_symbol(request.token_in));
    context.insert("token_out_symbol", &registry.display_symbol(request.token_out));
    context.insert("router_short", &short_address(state.builder.router()));
    context.insert("amount_in", &request.amount_in);
    context.insert("slippage_percent", &format!("{:.2}", Decimal::new(i64::from(request.slippage_bps), 2)));
    context.insert(
        "estimate",
        &prefill.as_ref().map_or_else(|| UNAVAILABLE.to_string(), |built| built.amount_out_human.clone()),
    );
    context.insert(
        "fee_estimate",
        &prefill
            .as_ref()
            .and_then(|built| built.gas_hint)
            .and_then(fee_estimate_eth)
            .map_or_else(|| UNAVAILABLE.to_string(), |eth| format!("~{eth}")),
    );
    context.insert("router", &state.builder.router().to_checksum(None));
    context.insert("explorer_tx_url", &state.explorer_tx_url);
    context.insert("pulls_native_value", &(request.token_in == registry.wrapped_native()));
    context.insert(
        "build_request",
        &json!({
            "chainId": request.chain_id,
            "tokenIn": request.token_in.to_checksum(None),
            "tokenOut": request.token_out.to_checksum(None),
            "amountIn": request.amount_in,
            "slippageBps": request.slippage_bps,
        }),
    );

    let html = state.templates.render(SIGN_SWAP_TEMPLATE, &context).map_err(|error| {
        warn!(event_name = "http.sign.render_failed", error = ?error, "signing page render failed");
        (StatusCode::INTERNAL_SERVER_ERROR, Html("<h1>Template Error</h1>".to_string()))
    })?;

    Ok(([(header::CACHE_CONTROL, "no-store")], Html(html)))
}

pub async fn build_swap(
    State(state): State<SigningState>,
    Json(params): Json<SwapParams>,
) -> (StatusCode, Json<BuildSwapResponse>) {
    let correlation_id = Uuid::new_v4().to_string();
    let reject = |message: String| {
        let error = InterfaceError::BadRequest { message, correlation_id: correlation_id.clone() };
        warn!(
            event_name = "http.sign.build_rejected",
            correlation_id = %correlation_id,
            error = %error,
            "swap build rejected"
        );
        (StatusCode::BAD_REQUEST, Json(BuildSwapResponse::rejected(&error)))
    };

    let request = match state.swap_request(&params) {
        Ok(request) => request,
        Err(message) => return reject(message),
    };

    match state.builder.build_fresh(&state.quotes, &request, Recipient::Caller).await {
        Ok(built) => {
            info!(
                event_name = "http.sign.built",
                correlation_id = %correlation_id,
                token_in = %request.token_in,
                token_out = %request.token_out,
                min_amount_out = %built.min_amount_out,
                "unsigned swap built"
            );
            (StatusCode::OK, Json(BuildSwapResponse::built(&built)))
        }
        Err(error) => reject(error.user_message()),
    }
}

fn escape(value: &str) -> String {
    value.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
