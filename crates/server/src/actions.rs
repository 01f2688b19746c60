//! `GET /act?id=`: the landing endpoint behind every tappable chat link.
//!
//! Always answers 200 with a tiny self-closing page so a tapped link never
//! shows an error screen.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::Html,
    routing::get,
    Router,
};
use serde::Deserialize;
use swapdesk_agent::AgentRuntime;
use swapdesk_core::errors::{ApplicationError, SwapError};
use tracing::{info, warn};
use uuid::Uuid;

const CLOSE_SCRIPT: &str =
    "<script>setTimeout(function(){ try{ window.close(); }catch(e){} }, 100);</script>";

#[derive(Clone)]
pub struct ActionsState {
    pub runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActQuery {
    pub id: Option<String>,
}

pub fn router(state: ActionsState) -> Router {
    Router::new().route("/act", get(act)).with_state(state)
}

pub async fn act(State(state): State<ActionsState>, Query(query): Query<ActQuery>) -> Html<String> {
    let ticket_id = query.id.unwrap_or_default();
    if ticket_id.is_empty() {
        return closing_page(&SwapError::TicketExpiredOrConsumed.user_message());
    }

    match state.runtime.handle_ticket(&ticket_id).await {
        Ok(true) => {
            info!(event_name = "http.act.replayed", "action link replayed");
            closing_page("OK")
        }
        Ok(false) => closing_page(&SwapError::TicketExpiredOrConsumed.user_message()),
        Err(error) => {
            let mapped = ApplicationError::Integration(error.to_string())
                .into_interface(Uuid::new_v4().to_string());
            warn!(
                event_name = "http.act.replay_failed",
                correlation_id = mapped.correlation_id(),
                error = %mapped,
                "action link replay failed"
            );
            closing_page(mapped.user_message())
        }
    }
}

fn closing_page(message: &str) -> Html<String> {
    Html(format!("{CLOSE_SCRIPT}{message}"))
}
