//! What the agent says back, independent of how a chat network renders it.

use std::sync::Mutex;
use std::sync::PoisonError;

use async_trait::async_trait;
use swapdesk_core::domain::swap::QuoteSummary;
use thiserror::Error;

use crate::news::{NewsItem, NewsTimeframe};

/// A tappable link backed by a single-use action ticket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionLink {
    pub label: String,
    pub href: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuoteActions {
    pub accept: ActionLink,
    pub slippage: Vec<ActionLink>,
    pub cancel: ActionLink,
    pub back: ActionLink,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MenuActions {
    pub swap: ActionLink,
    pub news: ActionLink,
    pub controls: QuoteActions,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AgentReply {
    Menu(MenuActions),
    SwapUsage { examples: Vec<ActionLink> },
    QuoteCard { summary: QuoteSummary, slippage_percent: u8, actions: QuoteActions },
    News { timeframe: NewsTimeframe, items: Vec<NewsItem>, back: ActionLink },
    SigningLink { href: String },
    Submitting { signer: String },
    Submitted { tx_hash: String, explorer_url: String },
    Pending { tx_hash: String, explorer_url: String },
    /// The command text behind a tapped action link, echoed into the room.
    Echo(String),
    Notice(String),
}

#[derive(Debug, Error)]
#[error("could not deliver reply to `{conversation_id}`: {reason}")]
pub struct OutboxError {
    pub conversation_id: String,
    pub reason: String,
}

#[async_trait]
pub trait ConversationOutbox: Send + Sync {
    async fn deliver(&self, conversation_id: &str, reply: AgentReply) -> Result<(), OutboxError>;
}

/// Keeps every reply in memory. Used by tests and the CLI dry run.
#[derive(Default)]
pub struct RecordingOutbox {
    replies: Mutex<Vec<(String, AgentReply)>>,
}

impl RecordingOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replies(&self) -> Vec<(String, AgentReply)> {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn replies_for(&self, conversation_id: &str) -> Vec<AgentReply> {
        self.replies()
            .into_iter()
            .filter(|(id, _)| id == conversation_id)
            .map(|(_, reply)| reply)
            .collect()
    }

    pub fn take(&self) -> Vec<(String, AgentReply)> {
        std::mem::take(&mut *self.replies.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[async_trait]
impl ConversationOutbox for RecordingOutbox {
    async fn deliver(&self, conversation_id: &str, reply: AgentReply) -> Result<(), OutboxError> {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((conversation_id.to_string(), reply));
        Ok(())
    }
}
