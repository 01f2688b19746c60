use serde::{Deserialize, Serialize};

use crate::domain::swap::Quote;

pub const DEFAULT_SLIPPAGE_PERCENT: u8 = 1;
pub const MAX_SLIPPAGE_PERCENT: u8 = 5;

/// Negotiation state for one conversation. Always replaced as a whole.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationSession {
    pub slippage_percent: u8,
    pub last_quote: Option<Quote>,
    pub decryption_warned: bool,
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self {
            slippage_percent: DEFAULT_SLIPPAGE_PERCENT,
            last_quote: None,
            decryption_warned: false,
        }
    }
}

impl ConversationSession {
    pub fn with_quote(&self, quote: Quote, slippage_percent: u8) -> Self {
        Self { slippage_percent, last_quote: Some(quote), ..self.clone() }
    }

    pub fn with_decryption_warned(&self) -> Self {
        Self { decryption_warned: true, ..self.clone() }
    }
}

pub fn slippage_bps(slippage_percent: u8) -> u32 {
    u32::from(slippage_percent) * 100
}
