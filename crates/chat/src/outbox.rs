use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use swapdesk_agent::reply::{AgentReply, ConversationOutbox, OutboxError};

use crate::render::render;
use crate::transport::ChatTransport;

/// Renders agent replies and sends them through a chat transport.
pub struct TransportOutbox {
    transport: Arc<dyn ChatTransport>,
}

impl TransportOutbox {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ConversationOutbox for TransportOutbox {
    async fn deliver(&self, conversation_id: &str, reply: AgentReply) -> Result<(), OutboxError> {
        let message = render(&reply);
        self.transport.send(conversation_id, &message).await.map_err(|error| {
            warn!(
                event_name = "egress.chat.send_failed",
                conversation_id,
                error = %error,
                "failed to deliver agent reply"
            );
            OutboxError { conversation_id: conversation_id.to_owned(), reason: error.to_string() }
        })
    }
}
