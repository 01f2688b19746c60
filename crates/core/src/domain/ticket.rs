use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Replayable command stored behind a tappable link.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTicket {
    pub conversation_id: String,
    pub command_text: String,
    pub expires_at: DateTime<Utc>,
}

impl ActionTicket {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// What a consumed ticket hands back to the dispatcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TicketCommand {
    pub conversation_id: String,
    pub command_text: String,
}
