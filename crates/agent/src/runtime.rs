use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use url::Url;

use swapdesk_core::config::AppConfig;
use swapdesk_core::domain::session::{slippage_bps, DEFAULT_SLIPPAGE_PERCENT, MAX_SLIPPAGE_PERCENT};
use swapdesk_core::domain::swap::{Quote, SwapRequest};
use swapdesk_core::errors::SwapError;
use swapdesk_core::session::SessionStore;
use swapdesk_core::swap::{QuoteEngine, SwapExecutor};
use swapdesk_core::tickets::ActionTicketRegistry;

use crate::conversation::ConversationLocks;
use crate::guardrails::{GuardrailDecision, GuardrailIntent, GuardrailPolicy, CLIENT_SIGNING_PATH};
use crate::intent::{self, Command};
use crate::news::{select_headlines, NewsFeed, NewsTimeframe, NoopNewsFeed};
use crate::reply::{ActionLink, AgentReply, ConversationOutbox, MenuActions, QuoteActions};

pub const UNRESOLVED_PAIR_MESSAGE: &str =
    "I couldn't resolve that token pair on Ethereum. Try symbols like ETH/USDC/USDT.";
pub const SLIPPAGE_REFRESH_FAILED_MESSAGE: &str = "Couldn't refresh quote with that slippage.";
pub const NOTHING_TO_ACCEPT_MESSAGE: &str = "No quote to accept. Try a swap first.";
pub const UNDECRYPTABLE_MESSAGE: &str = "I received an encrypted message but could not decrypt it. \
Please ensure your room shares keys with unverified devices or invite me to a non-encrypted room.";

/// Deployment values the dispatcher needs at reply time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentSettings {
    pub chain_id: u64,
    /// Origin serving `/act`; no trailing slash.
    pub action_base_url: String,
    /// Origin serving `/sign/swap`, when client signing is deployed.
    pub signing_base_url: Option<String>,
    pub explorer_tx_url: String,
}

impl AgentSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            chain_id: config.chain.chain_id,
            action_base_url: config.server.action_base_url(),
            signing_base_url: config
                .server
                .app_base_url
                .as_ref()
                .map(|base| base.trim_end_matches('/').to_string()),
            explorer_tx_url: config.chain.explorer_tx_url.clone(),
        }
    }

    fn explorer_link(&self, tx_hash: &str) -> String {
        format!("{}{tx_hash}", self.explorer_tx_url)
    }
}

/// Turns one chat message into replies, one conversation at a time.
pub struct AgentRuntime {
    sessions: Arc<dyn SessionStore>,
    tickets: Arc<ActionTicketRegistry>,
    quotes: Arc<QuoteEngine>,
    executor: Option<Arc<SwapExecutor>>,
    news: Arc<dyn NewsFeed>,
    outbox: Arc<dyn ConversationOutbox>,
    settings: AgentSettings,
    locks: ConversationLocks,
}

impl AgentRuntime {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        tickets: Arc<ActionTicketRegistry>,
        quotes: Arc<QuoteEngine>,
        outbox: Arc<dyn ConversationOutbox>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            sessions,
            tickets,
            quotes,
            executor: None,
            news: Arc::new(NoopNewsFeed),
            outbox,
            settings,
            locks: ConversationLocks::new(),
        }
    }

    /// Accepted quotes are executed with this executor's key instead of a signing link.
    pub fn with_executor(mut self, executor: Arc<SwapExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn with_news_feed(mut self, news: Arc<dyn NewsFeed>) -> Self {
        self.news = news;
        self
    }

    pub fn tickets(&self) -> &Arc<ActionTicketRegistry> {
        &self.tickets
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn guardrails(&self) -> GuardrailPolicy {
        GuardrailPolicy {
            custodial_execution_enabled: self.executor.is_some(),
            signing_app_configured: self.settings.signing_base_url.is_some(),
            max_slippage_percent: MAX_SLIPPAGE_PERCENT,
        }
    }

    pub async fn handle_message(&self, conversation_id: &str, text: &str) -> Result<()> {
        let _turn = self.locks.acquire(conversation_id).await;
        let command = intent::parse(text);
        debug!(event_name = "agent.command.parsed", conversation_id, command = ?command, "command parsed");
        self.dispatch(conversation_id, command).await
    }

    /// Replays the command behind an action link. `false` when the ticket is
    /// unknown, expired or already used.
    pub async fn handle_ticket(&self, ticket_id: &str) -> Result<bool> {
        let Some(ticket) = self.tickets.consume(ticket_id).await else {
            debug!(event_name = "agent.ticket.rejected", "action ticket unknown or expired");
            return Ok(false);
        };
        // The echo is cosmetic; a failed send must not block the replay.
        if let Err(error) =
            self.deliver(&ticket.conversation_id, AgentReply::Echo(ticket.command_text.clone())).await
        {
            warn!(
                event_name = "agent.ticket.echo_failed",
                conversation_id = %ticket.conversation_id,
                error = %error,
                "could not echo replayed command"
            );
        }
        self.handle_message(&ticket.conversation_id, &ticket.command_text).await?;
        Ok(true)
    }

    /// Warns about an undecryptable event at most once per conversation.
    pub async fn handle_undecryptable(&self, conversation_id: &str) -> Result<()> {
        let _turn = self.locks.acquire(conversation_id).await;
        let session = self.sessions.get(conversation_id).await;
        if session.decryption_warned {
            return Ok(());
        }
        self.deliver(conversation_id, AgentReply::Notice(UNDECRYPTABLE_MESSAGE.to_string())).await?;
        self.sessions.set(conversation_id, session.with_decryption_warned()).await?;
        Ok(())
    }

    async fn dispatch(&self, conversation_id: &str, command: Command) -> Result<()> {
        match command {
            Command::ShowMenu => self.send_menu(conversation_id).await,
            Command::SwapUsage => self.send_swap_usage(conversation_id).await,
            Command::RequestSwap { amount, base, quote, slippage } => {
                self.request_swap(conversation_id, amount, &base, &quote, slippage).await
            }
            Command::ShowNews { timeframe } => {
                self.send_news(conversation_id, timeframe.unwrap_or_default()).await
            }
            Command::AdjustSlippage { level } => self.adjust_slippage(conversation_id, level).await,
            Command::Accept | Command::Confirm => self.accept(conversation_id).await,
            Command::Cancel | Command::Back => {
                self.sessions.reset(conversation_id).await?;
                self.send_menu(conversation_id).await
            }
        }
    }

    async fn request_swap(
        &self,
        conversation_id: &str,
        amount: Decimal,
        base: &str,
        quote: &str,
        slippage: Option<u8>,
    ) -> Result<()> {
        if amount <= Decimal::ZERO {
            return self.send_swap_usage(conversation_id).await;
        }
        let Some(pair) = self.quotes.registry().resolve_pair(base, quote) else {
            return self.notice(conversation_id, UNRESOLVED_PAIR_MESSAGE).await;
        };

        let slippage_percent = slippage.unwrap_or(DEFAULT_SLIPPAGE_PERCENT);
        let request = SwapRequest {
            chain_id: self.settings.chain_id,
            token_in: pair.token_in.address,
            token_out: pair.token_out.address,
            amount_in: amount.normalize().to_string(),
            slippage_bps: slippage_bps(slippage_percent),
        };
        let Some(fresh) = self.quotes.get_quote(&request).await else {
            return self.notice(conversation_id, &SwapError::NoRouteAvailable.user_message()).await;
        };

        self.store_quote(conversation_id, &fresh, slippage_percent).await?;
        self.send_quote_card(conversation_id, fresh, slippage_percent).await
    }

    async fn adjust_slippage(&self, conversation_id: &str, level: u8) -> Result<()> {
        match self.guardrails().evaluate(&GuardrailIntent::AdjustSlippage { level }) {
            GuardrailDecision::Allow => {}
            GuardrailDecision::Deny { user_message, .. }
            | GuardrailDecision::Degrade { user_message, .. } => {
                return self.notice(conversation_id, &user_message).await;
            }
        }

        let session = self.sessions.get(conversation_id).await;
        let Some(previous) = session.last_quote else {
            return self.notice(conversation_id, &SwapError::StaleSessionState.user_message()).await;
        };
        let request = previous.request.with_slippage_bps(slippage_bps(level));
        let Some(fresh) = self.quotes.get_quote(&request).await else {
            return self.notice(conversation_id, SLIPPAGE_REFRESH_FAILED_MESSAGE).await;
        };

        self.store_quote(conversation_id, &fresh, level).await?;
        self.send_quote_card(conversation_id, fresh, level).await
    }

    async fn accept(&self, conversation_id: &str) -> Result<()> {
        let session = self.sessions.get(conversation_id).await;
        let Some(quote) = session.last_quote else {
            return self.notice(conversation_id, NOTHING_TO_ACCEPT_MESSAGE).await;
        };

        let decision = self.guardrails().evaluate(&GuardrailIntent::AcceptQuote);
        match (decision, self.executor.as_ref()) {
            (GuardrailDecision::Allow, Some(executor)) => {
                self.execute(conversation_id, executor, &quote, session.slippage_percent).await
            }
            (GuardrailDecision::Degrade { fallback_path, .. }, _)
                if fallback_path == CLIENT_SIGNING_PATH =>
            {
                self.send_signing_link(conversation_id, &quote, session.slippage_percent).await
            }
            (GuardrailDecision::Deny { reason_code, user_message, .. }, _)
            | (GuardrailDecision::Degrade { reason_code, user_message, .. }, _) => {
                info!(event_name = "agent.accept.blocked", conversation_id, reason_code, "accept blocked");
                self.notice(conversation_id, &user_message).await
            }
            (GuardrailDecision::Allow, None) => {
                self.send_signing_link(conversation_id, &quote, session.slippage_percent).await
            }
        }
    }

    async fn execute(
        &self,
        conversation_id: &str,
        executor: &SwapExecutor,
        quote: &Quote,
        slippage_percent: u8,
    ) -> Result<()> {
        let signer = executor.signer().to_checksum(None);
        self.deliver(conversation_id, AgentReply::Submitting { signer }).await?;

        let reply = match executor.execute(quote, slippage_percent).await {
            Ok(receipt) => {
                let tx_hash = receipt.tx_hash.to_string();
                info!(
                    event_name = "agent.swap.executed",
                    conversation_id,
                    tx_hash = %tx_hash,
                    block_number = ?receipt.block_number,
                    "custodial swap confirmed"
                );
                AgentReply::Submitted { explorer_url: self.settings.explorer_link(&tx_hash), tx_hash }
            }
            Err(SwapError::TransactionNotMined { tx_hash }) => AgentReply::Pending {
                explorer_url: self.settings.explorer_link(&tx_hash),
                tx_hash,
            },
            Err(error) => {
                warn!(
                    event_name = "agent.swap.execution_failed",
                    conversation_id,
                    error = %error,
                    "custodial swap failed"
                );
                AgentReply::Notice(error.user_message())
            }
        };
        self.deliver(conversation_id, reply).await
    }

    async fn send_signing_link(
        &self,
        conversation_id: &str,
        quote: &Quote,
        slippage_percent: u8,
    ) -> Result<()> {
        let Some(base) = self.settings.signing_base_url.as_deref() else {
            return self.notice(conversation_id, "Signing app URL not configured (APP_BASE_URL).").await;
        };
        let mut href = Url::parse(&format!("{}/sign/swap", base.trim_end_matches('/')))?;
        href.query_pairs_mut()
            .append_pair("chainId", &quote.request.chain_id.to_string())
            .append_pair("tokenIn", &quote.request.token_in.to_checksum(None))
            .append_pair("tokenOut", &quote.request.token_out.to_checksum(None))
            .append_pair("amountIn", &quote.request.amount_in)
            .append_pair("slippageBps", &slippage_bps(slippage_percent).to_string());
        self.deliver(conversation_id, AgentReply::SigningLink { href: href.into() }).await
    }

    async fn send_news(&self, conversation_id: &str, timeframe: NewsTimeframe) -> Result<()> {
        let items = match self.news.latest(timeframe).await {
            Ok(items) => select_headlines(items, timeframe, Utc::now()),
            Err(error) => {
                warn!(event_name = "agent.news.unavailable", error = %error, "news feed failed");
                Vec::new()
            }
        };
        let back = self.link(conversation_id, "BACK", "!back").await;
        self.deliver(conversation_id, AgentReply::News { timeframe, items, back }).await
    }

    async fn send_menu(&self, conversation_id: &str) -> Result<()> {
        let swap = self.link(conversation_id, "SWAP 0.1 ETH to USDC", "!swap 0.1 ETH to USDC").await;
        let news = self.link(conversation_id, "NEWS", "!news").await;
        let controls = self.quote_actions(conversation_id).await;
        self.deliver(conversation_id, AgentReply::Menu(MenuActions { swap, news, controls })).await
    }

    async fn send_swap_usage(&self, conversation_id: &str) -> Result<()> {
        let examples = vec![
            self.link(conversation_id, "SWAP 0.5 ETH to USDC", "!swap 0.5 ETH to USDC").await,
            self.link(conversation_id, "ETH/USDT 1000", "!eth/usdt 1000").await,
            self.link(conversation_id, "NEWS", "!news").await,
        ];
        self.deliver(conversation_id, AgentReply::SwapUsage { examples }).await
    }

    async fn send_quote_card(
        &self,
        conversation_id: &str,
        quote: Quote,
        slippage_percent: u8,
    ) -> Result<()> {
        let actions = self.quote_actions(conversation_id).await;
        let reply = AgentReply::QuoteCard { summary: quote.summary, slippage_percent, actions };
        self.deliver(conversation_id, reply).await
    }

    async fn quote_actions(&self, conversation_id: &str) -> QuoteActions {
        let accept = self.link(conversation_id, "ACCEPT", "!accept").await;
        let mut slippage = Vec::with_capacity(usize::from(MAX_SLIPPAGE_PERCENT));
        for level in 1..=MAX_SLIPPAGE_PERCENT {
            slippage.push(self.link(conversation_id, level.to_string(), &format!("!slippage {level}")).await);
        }
        let cancel = self.link(conversation_id, "CANCEL", "!cancel").await;
        let back = self.link(conversation_id, "BACK", "!back").await;
        QuoteActions { accept, slippage, cancel, back }
    }

    async fn store_quote(&self, conversation_id: &str, quote: &Quote, slippage_percent: u8) -> Result<()> {
        let session = self.sessions.get(conversation_id).await;
        self.sessions
            .set(conversation_id, session.with_quote(quote.clone(), slippage_percent))
            .await?;
        info!(
            event_name = "agent.swap.quoted",
            conversation_id,
            token_in = %quote.request.token_in,
            token_out = %quote.request.token_out,
            amount_in = %quote.request.amount_in,
            fee_tier = %quote.raw.fee_tier,
            slippage_percent,
            "quote stored"
        );
        Ok(())
    }

    async fn link(&self, conversation_id: &str, label: impl Into<String>, command: &str) -> ActionLink {
        let ticket = self.tickets.create(conversation_id, command).await;
        ActionLink {
            label: label.into(),
            href: format!("{}/act?id={ticket}", self.settings.action_base_url),
        }
    }

    async fn notice(&self, conversation_id: &str, message: &str) -> Result<()> {
        self.deliver(conversation_id, AgentReply::Notice(message.to_string())).await
    }

    async fn deliver(&self, conversation_id: &str, reply: AgentReply) -> Result<()> {
        self.outbox.deliver(conversation_id, reply).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use alloy_primitives::{address, Address, U256};
    use swapdesk_core::chain::abi::SWAP_ROUTER_02;
    use swapdesk_core::chain::scripted::{PoolScript, ScriptedChain, ScriptedConnector};
    use swapdesk_core::domain::token::{USDC, WETH};
    use swapdesk_core::session::{InMemorySessionStore, SessionStore};
    use swapdesk_core::swap::{ConfirmationPolicy, QuoteEngine, SwapExecutor};
    use swapdesk_core::tickets::ActionTicketRegistry;

    use super::{
        AgentRuntime, AgentSettings, NOTHING_TO_ACCEPT_MESSAGE, UNDECRYPTABLE_MESSAGE,
        UNRESOLVED_PAIR_MESSAGE,
    };
    use crate::reply::{AgentReply, RecordingOutbox};

    const RPC: &str = "https://rpc.example";
    const ROOM: &str = "!room:example.org";
    const SIGNER: Address = address!("0x2222222222222222222222222222222222222222");

    struct Harness {
        runtime: AgentRuntime,
        outbox: Arc<RecordingOutbox>,
        sessions: Arc<InMemorySessionStore>,
        chain: Arc<ScriptedChain>,
    }

    fn settings(signing_base_url: Option<&str>) -> AgentSettings {
        AgentSettings {
            chain_id: 1,
            action_base_url: "https://bot.example".to_string(),
            signing_base_url: signing_base_url.map(str::to_string),
            explorer_tx_url: "https://etherscan.io/tx/".to_string(),
        }
    }

    fn harness(chain: ScriptedChain, settings: AgentSettings) -> Harness {
        let chain = Arc::new(chain);
        let connector = ScriptedConnector::new().with_endpoint(RPC, chain.clone());
        let quotes = QuoteEngine::new(Arc::new(connector), vec![RPC.to_string()], Duration::from_secs(1));
        let outbox = Arc::new(RecordingOutbox::new());
        let sessions = Arc::new(InMemorySessionStore::new());
        let runtime = AgentRuntime::new(
            sessions.clone(),
            Arc::new(ActionTicketRegistry::new()),
            Arc::new(quotes),
            outbox.clone(),
            settings,
        );
        Harness { runtime, outbox, sessions, chain }
    }

    fn liquid_chain() -> ScriptedChain {
        ScriptedChain::new()
            .with_gas_price(12_345_678_901)
            .with_pool(WETH, USDC, 500, PoolScript::Quoted(U256::from(294_123_456u64)))
    }

    fn last_reply(outbox: &RecordingOutbox) -> AgentReply {
        outbox.replies_for(ROOM).pop().expect("a reply")
    }

    fn notice(text: &str) -> AgentReply {
        AgentReply::Notice(text.to_string())
    }

    #[tokio::test]
    async fn unmatched_text_shows_the_menu_with_ticket_links() {
        let h = harness(liquid_chain(), settings(None));

        h.runtime.handle_message(ROOM, "what can you do").await.expect("handled");

        let AgentReply::Menu(menu) = last_reply(&h.outbox) else { panic!("expected menu") };
        assert_eq!(menu.swap.label, "SWAP 0.1 ETH to USDC");
        assert!(menu.news.href.starts_with("https://bot.example/act?id="));
        assert_eq!(menu.controls.slippage.len(), 5);
        assert_eq!(h.runtime.tickets().len().await, 10);
    }

    #[tokio::test]
    async fn swap_request_quotes_and_stores_the_session() {
        let h = harness(liquid_chain(), settings(None));

        h.runtime.handle_message(ROOM, "!swap 0.1 ETH to USDC").await.expect("handled");

        let AgentReply::QuoteCard { summary, slippage_percent, actions } = last_reply(&h.outbox) else {
            panic!("expected quote card")
        };
        assert_eq!(summary.amount_out, "294.123456");
        assert_eq!(summary.fee_summary, "gasPrice≈12.35 gwei");
        assert_eq!(slippage_percent, 1);
        assert_eq!(actions.accept.label, "ACCEPT");

        let session = h.sessions.get(ROOM).await;
        let stored = session.last_quote.expect("stored quote");
        assert_eq!(stored.request.amount_in, "0.1");
        assert_eq!(stored.request.slippage_bps, 100);
    }

    #[tokio::test]
    async fn unknown_pair_and_missing_route_are_reported() {
        let h = harness(ScriptedChain::new(), settings(None));

        h.runtime.handle_message(ROOM, "swap 1 pepe to usdc").await.expect("handled");
        assert_eq!(last_reply(&h.outbox), notice(UNRESOLVED_PAIR_MESSAGE));

        h.runtime.handle_message(ROOM, "eth/usdc 1").await.expect("handled");
        assert_eq!(
            last_reply(&h.outbox),
            notice("No route or quote available right now. Try a different amount or pair.")
        );
        assert!(h.sessions.get(ROOM).await.last_quote.is_none());
    }

    #[tokio::test]
    async fn zero_amount_gets_usage_help() {
        let h = harness(liquid_chain(), settings(None));

        h.runtime.handle_message(ROOM, "swap 0 eth to usdc").await.expect("handled");

        let AgentReply::SwapUsage { examples } = last_reply(&h.outbox) else { panic!("expected usage") };
        assert_eq!(examples.len(), 3);
    }

    #[tokio::test]
    async fn slippage_needs_an_active_quote() {
        let h = harness(liquid_chain(), settings(None));

        h.runtime.handle_message(ROOM, "!slippage 3").await.expect("handled");

        assert_eq!(last_reply(&h.outbox), notice("No active quote yet. Say `!swap 0.5 ETH to USDC` first."));
    }

    #[tokio::test]
    async fn slippage_change_requotes_with_the_new_tolerance() {
        let h = harness(liquid_chain(), settings(None));
        h.runtime.handle_message(ROOM, "swap 0.1 eth to usdc").await.expect("quote");

        h.runtime.handle_message(ROOM, "!slippage 3").await.expect("slippage");

        assert!(matches!(last_reply(&h.outbox), AgentReply::QuoteCard { slippage_percent: 3, .. }));
        let session = h.sessions.get(ROOM).await;
        assert_eq!(session.slippage_percent, 3);
        assert_eq!(session.last_quote.expect("quote").request.slippage_bps, 300);
    }

    #[tokio::test]
    async fn accept_without_a_quote_is_refused() {
        let h = harness(liquid_chain(), settings(Some("https://app.example")));

        h.runtime.handle_message(ROOM, "!accept").await.expect("handled");

        assert_eq!(last_reply(&h.outbox), notice(NOTHING_TO_ACCEPT_MESSAGE));
    }

    #[tokio::test]
    async fn accept_without_custody_links_to_the_signing_page() {
        let h = harness(liquid_chain(), settings(Some("https://app.example/")));
        h.runtime.handle_message(ROOM, "swap 0.1 eth to usdc slippage 2").await.expect("quote");

        h.runtime.handle_message(ROOM, "!confirm").await.expect("accept");

        let AgentReply::SigningLink { href } = last_reply(&h.outbox) else { panic!("expected link") };
        assert!(href.starts_with("https://app.example/sign/swap?chainId=1&tokenIn=0xC02aaA39"));
        assert!(href.contains("tokenOut=0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"));
        assert!(href.contains("amountIn=0.1"));
        assert!(href.ends_with("slippageBps=200"));
    }

    #[tokio::test]
    async fn accept_without_any_signing_path_explains_the_configuration_gap() {
        let h = harness(liquid_chain(), settings(None));
        h.runtime.handle_message(ROOM, "swap 0.1 eth to usdc").await.expect("quote");

        h.runtime.handle_message(ROOM, "accept").await.expect("accept");

        assert_eq!(last_reply(&h.outbox), notice("Signing app URL not configured (APP_BASE_URL)."));
    }

    #[tokio::test]
    async fn custodial_accept_submits_and_reports_the_transaction() {
        let chain = liquid_chain()
            .with_signer(SIGNER)
            .with_balance(WETH, SIGNER, U256::from(10u64).pow(U256::from(18u64)))
            .with_allowance(WETH, SIGNER, SWAP_ROUTER_02, U256::MAX);
        let h = harness(chain, settings(None));
        let executor = SwapExecutor::new(
            h.chain.clone(),
            ConfirmationPolicy { poll_interval: Duration::from_millis(1), max_polls: 3 },
            Duration::from_secs(1),
        )
        .expect("executor");
        let Harness { runtime, outbox, chain, .. } = h;
        let runtime = runtime.with_executor(Arc::new(executor));

        runtime.handle_message(ROOM, "swap 0.1 eth to usdc").await.expect("quote");
        runtime.handle_message(ROOM, "!accept").await.expect("accept");

        let replies = outbox.replies_for(ROOM);
        let tail = &replies[replies.len() - 2..];
        assert_eq!(tail[0], AgentReply::Submitting { signer: SIGNER.to_checksum(None) });
        let AgentReply::Submitted { tx_hash, explorer_url } = &tail[1] else {
            panic!("expected submitted, got {:?}", tail[1])
        };
        assert_eq!(explorer_url, &format!("https://etherscan.io/tx/{tx_hash}"));
        assert_eq!(chain.sent_transactions().len(), 1);
    }

    #[tokio::test]
    async fn cancel_and_back_reset_the_session() {
        let h = harness(liquid_chain(), settings(None));
        h.runtime.handle_message(ROOM, "swap 0.1 eth to usdc slippage 4").await.expect("quote");

        h.runtime.handle_message(ROOM, "!cancel").await.expect("cancel");

        assert!(matches!(last_reply(&h.outbox), AgentReply::Menu(_)));
        let session = h.sessions.get(ROOM).await;
        assert!(session.last_quote.is_none());
        assert_eq!(session.slippage_percent, 1);
    }

    #[tokio::test]
    async fn news_replies_even_when_the_feed_is_empty() {
        let h = harness(liquid_chain(), settings(None));

        h.runtime.handle_message(ROOM, "!news 7d").await.expect("news");

        let AgentReply::News { timeframe, items, back } = last_reply(&h.outbox) else {
            panic!("expected news")
        };
        assert_eq!(timeframe.as_str(), "7d");
        assert!(items.is_empty());
        assert_eq!(back.label, "BACK");
    }

    #[tokio::test]
    async fn undecryptable_events_warn_once() {
        let h = harness(liquid_chain(), settings(None));

        h.runtime.handle_undecryptable(ROOM).await.expect("first");
        h.runtime.handle_undecryptable(ROOM).await.expect("second");

        assert_eq!(h.outbox.replies_for(ROOM), vec![notice(UNDECRYPTABLE_MESSAGE)]);
        assert!(h.sessions.get(ROOM).await.decryption_warned);
    }

    #[tokio::test]
    async fn tickets_replay_their_command_once() {
        let h = harness(liquid_chain(), settings(None));
        let ticket = h.runtime.tickets().create(ROOM, "!swap 0.1 ETH to USDC").await;

        assert!(h.runtime.handle_ticket(&ticket).await.expect("first tap"));
        assert!(!h.runtime.handle_ticket(&ticket).await.expect("second tap"));

        let replies = h.outbox.replies_for(ROOM);
        assert_eq!(replies[0], AgentReply::Echo("!swap 0.1 ETH to USDC".to_string()));
        assert!(matches!(replies[1], AgentReply::QuoteCard { .. }));
    }
}
