use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::events::{ChatEnvelope, EventContext, EventDispatcher};
use crate::render::RenderedMessage;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport send failed: {0}")]
    Send(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    /// `None` once the stream is closed.
    async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError>;
    async fn send(&self, conversation_id: &str, message: &RenderedMessage) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

/// Headless deployments: no inbound events, outbound messages are dropped.
#[derive(Default)]
pub struct NoopChatTransport;

#[async_trait]
impl ChatTransport for NoopChatTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError> {
        Ok(None)
    }

    async fn send(&self, conversation_id: &str, _message: &RenderedMessage) -> Result<(), TransportError> {
        info!(
            event_name = "egress.chat.dropped",
            conversation_id,
            "no chat transport configured; message dropped"
        );
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

pub struct ChatRunner {
    transport: Arc<dyn ChatTransport>,
    dispatcher: Arc<EventDispatcher>,
    reconnect_policy: ReconnectPolicy,
}

impl ChatRunner {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        dispatcher: EventDispatcher,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher: Arc::new(dispatcher), reconnect_policy }
    }

    pub async fn start(&self) -> Result<()> {
        for attempt in 0..=self.reconnect_policy.max_retries {
            match self.connect_and_pump(attempt).await {
                Ok(()) => return Ok(()),
                Err(transport_error) => {
                    warn!(
                        event_name = "ingress.chat.transport_failed",
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "chat transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "chat transport retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), TransportError> {
        info!(attempt, "opening chat transport connection");
        self.transport.connect().await?;
        info!(attempt, "chat transport connected");

        // Each event runs in its own task; the agent serializes per conversation.
        let mut in_flight = JoinSet::new();
        let outcome = self.pump(attempt, &mut in_flight).await;
        while in_flight.join_next().await.is_some() {}
        outcome
    }

    async fn pump(&self, attempt: u32, in_flight: &mut JoinSet<()>) -> Result<(), TransportError> {
        loop {
            while in_flight.try_join_next().is_some() {}

            let Some(envelope) = self.transport.next_envelope().await? else {
                while in_flight.try_join_next().is_some() {}
                info!(attempt, "chat transport stream closed");
                self.transport.disconnect().await?;
                return Ok(());
            };

            info!(
                event_name = "ingress.chat.event_received",
                event_id = %envelope.event_id,
                event_type = ?envelope.event.event_type(),
                correlation_id = %envelope.event_id,
                conversation_id = %envelope.conversation_id,
                "received chat event"
            );

            let dispatcher = self.dispatcher.clone();
            in_flight.spawn(async move {
                let context = EventContext { correlation_id: envelope.event_id.clone() };
                if let Err(error) = dispatcher.dispatch(&envelope, &context).await {
                    warn!(
                        event_name = "ingress.chat.dispatch_failed",
                        event_id = %envelope.event_id,
                        correlation_id = %envelope.event_id,
                        conversation_id = %envelope.conversation_id,
                        error = %error,
                        "event dispatch failed; continuing chat loop"
                    );
                }
            });
        }
    }
}
