//! Single-use, short-lived tokens standing in for a replayable command.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::ticket::{ActionTicket, TicketCommand};

pub const TICKET_TTL: Duration = Duration::from_secs(10 * 60);
pub const TICKET_ID_LEN: usize = 24;

const TICKET_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Default)]
pub struct ActionTicketRegistry {
    tickets: Mutex<HashMap<String, ActionTicket>>,
}

impl ActionTicketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, conversation_id: &str, command_text: &str) -> String {
        self.create_with_ttl(conversation_id, command_text, TICKET_TTL).await
    }

    pub async fn create_with_ttl(
        &self,
        conversation_id: &str,
        command_text: &str,
        ttl: Duration,
    ) -> String {
        let now = Utc::now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut tickets = self.tickets.lock().await;
        tickets.retain(|_, ticket| !ticket.is_expired_at(now));

        let mut id = random_ticket_id();
        while tickets.contains_key(&id) {
            id = random_ticket_id();
        }
        tickets.insert(
            id.clone(),
            ActionTicket {
                conversation_id: conversation_id.to_string(),
                command_text: command_text.to_string(),
                expires_at,
            },
        );
        id
    }

    pub async fn consume(&self, ticket_id: &str) -> Option<TicketCommand> {
        self.consume_at(ticket_id, Utc::now()).await
    }

    /// Removes the ticket whether or not it has expired.
    pub async fn consume_at(&self, ticket_id: &str, now: DateTime<Utc>) -> Option<TicketCommand> {
        let ticket = self.tickets.lock().await.remove(ticket_id)?;
        if ticket.is_expired_at(now) {
            debug!(event_name = "tickets.consume.expired", "action ticket expired");
            return None;
        }
        Some(TicketCommand {
            conversation_id: ticket.conversation_id,
            command_text: ticket.command_text,
        })
    }

    pub async fn len(&self) -> usize {
        self.tickets.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn random_ticket_id() -> String {
    let mut rng = rand::thread_rng();
    (0..TICKET_ID_LEN)
        .map(|_| char::from(TICKET_ALPHABET[rng.gen_range(0..TICKET_ALPHABET.len())]))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;

    use super::{ActionTicketRegistry, TICKET_ID_LEN};

    #[tokio::test]
    async fn ids_are_fixed_length_lowercase_alphanumeric() {
        let registry = ActionTicketRegistry::new();
        let id = registry.create("room", "!accept").await;

        assert_eq!(id.len(), TICKET_ID_LEN);
        assert!(id.chars().all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit()));
    }

    #[tokio::test]
    async fn a_ticket_can_be_consumed_only_once() {
        let registry = ActionTicketRegistry::new();
        let id = registry.create("room", "!slippage 3").await;

        let command = registry.consume(&id).await.expect("first consume");
        assert_eq!(command.conversation_id, "room");
        assert_eq!(command.command_text, "!slippage 3");

        assert!(registry.consume(&id).await.is_none());
        assert!(registry.consume(&id).await.is_none());
    }

    #[tokio::test]
    async fn expired_tickets_read_as_missing_and_are_removed() {
        let registry = ActionTicketRegistry::new();
        let id = registry.create("room", "!accept").await;
        let later = Utc::now() + chrono::Duration::minutes(11);

        assert!(registry.consume_at(&id, later).await.is_none());
        assert!(registry.is_empty().await);
        assert!(registry.consume(&id).await.is_none());
    }

    #[tokio::test]
    async fn unknown_ids_are_ignored() {
        let registry = ActionTicketRegistry::new();
        assert!(registry.consume("doesnotexist").await.is_none());
    }

    #[tokio::test]
    async fn creating_a_ticket_purges_expired_ones() {
        let registry = ActionTicketRegistry::new();
        registry.create_with_ttl("room", "!news", Duration::ZERO).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        registry.create("room", "!accept").await;

        assert_eq!(registry.len().await, 1);
    }
}
