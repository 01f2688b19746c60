use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::U256;
use async_trait::async_trait;
use tokio::sync::Mutex;

use swapdesk_agent::{AgentRuntime, AgentSettings};
use swapdesk_chat::events::{EventContext, MessageEvent};
use swapdesk_chat::{ChatEnvelope, ChatEvent, ChatTransport, EventDispatcher, RenderedMessage, TransportError, TransportOutbox};
use swapdesk_core::chain::scripted::{PoolScript, ScriptedChain, ScriptedConnector};
use swapdesk_core::domain::token::{USDC, WETH};
use swapdesk_core::session::InMemorySessionStore;
use swapdesk_core::swap::QuoteEngine;
use swapdesk_core::tickets::ActionTicketRegistry;

const RPC: &str = "https://rpc.example";

#[derive(Default)]
struct CapturingTransport {
    sent: Mutex<Vec<(String, RenderedMessage)>>,
}

#[async_trait]
impl ChatTransport for CapturingTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError> {
        Ok(None)
    }

    async fn send(&self, conversation_id: &str, message: &RenderedMessage) -> Result<(), TransportError> {
        self.sent.lock().await.push((conversation_id.to_owned(), message.clone()));
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

fn runtime(transport: Arc<CapturingTransport>) -> Arc<AgentRuntime> {
    let chain = ScriptedChain::new()
        .with_pool(WETH, USDC, 3_000, PoolScript::Quoted(U256::from(250_000_000u64)));
    let connector = ScriptedConnector::new().with_endpoint(RPC, Arc::new(chain));
    let quotes = QuoteEngine::new(Arc::new(connector), vec![RPC.to_owned()], Duration::from_secs(1));
    Arc::new(AgentRuntime::new(
        Arc::new(InMemorySessionStore::new()),
        Arc::new(ActionTicketRegistry::new()),
        Arc::new(quotes),
        Arc::new(TransportOutbox::new(transport)),
        AgentSettings {
            chain_id: 1,
            action_base_url: "http://localhost:8080".to_owned(),
            signing_base_url: Some("https://app.example".to_owned()),
            explorer_tx_url: "https://etherscan.io/tx/".to_owned(),
        },
    ))
}

fn text(body: &str) -> ChatEnvelope {
    ChatEnvelope {
        event_id: "$evt".to_owned(),
        conversation_id: "!trading:example.org".to_owned(),
        sender: "@alice:example.org".to_owned(),
        event: ChatEvent::Message(MessageEvent::text(body)),
    }
}

#[tokio::test]
async fn swap_then_accept_emoji_produces_quote_card_and_signing_link() -> Result<(), String> {
    let transport = Arc::new(CapturingTransport::default());
    let dispatcher = EventDispatcher::new(runtime(transport.clone()), None);
    let ctx = EventContext::default();

    dispatcher.dispatch(&text("!swap 0.1 ETH to USDC"), &ctx).await.map_err(|e| e.to_string())?;
    dispatcher.dispatch(&text("✅"), &ctx).await.map_err(|e| e.to_string())?;

    let sent = transport.sent.lock().await.clone();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|(room, _)| room == "!trading:example.org"));

    let card = sent[0].1.html.clone().ok_or("quote card should be html")?;
    assert!(card.contains("Est. receive: <b>250.0 USDC</b>"), "{card}");
    assert!(card.contains("http://localhost:8080/act?id="));

    let sign = sent[1].1.html.clone().ok_or("signing link should be html")?;
    assert!(sign.contains("https://app.example/sign/swap?chainId=1"), "{sign}");
    assert!(sign.contains("slippageBps=100"));
    Ok(())
}

#[tokio::test]
async fn tapped_ticket_echoes_and_replays_the_command() -> Result<(), String> {
    let transport = Arc::new(CapturingTransport::default());
    let runtime = runtime(transport.clone());
    let ticket = runtime.tickets().create("!trading:example.org", "!news").await;

    let replayed = runtime.handle_ticket(&ticket).await.map_err(|e| e.to_string())?;

    assert!(replayed);
    let sent = transport.sent.lock().await.clone();
    assert_eq!(sent[0].1.body, "!news");
    assert!(sent[1].1.body.starts_with("Top headlines (last 24h)"));
    Ok(())
}
