use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use swapdesk_agent::AgentRuntime;

use crate::emoji;

pub const TEXT_MSGTYPE: &str = "m.text";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatEnvelope {
    pub event_id: String,
    pub conversation_id: String,
    pub sender: String,
    pub event: ChatEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatEvent {
    Message(MessageEvent),
    Reaction { key: String },
    /// An event the transport could not decrypt.
    Encrypted,
    Unsupported { event_type: String },
}

impl ChatEvent {
    pub fn event_type(&self) -> ChatEventType {
        match self {
            Self::Message(_) => ChatEventType::Message,
            Self::Reaction { .. } => ChatEventType::Reaction,
            Self::Encrypted => ChatEventType::Encrypted,
            Self::Unsupported { .. } => ChatEventType::Unsupported,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChatEventType {
    Message,
    Reaction,
    Encrypted,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub msgtype: String,
    pub body: String,
}

impl MessageEvent {
    pub fn text(body: impl Into<String>) -> Self {
        Self { msgtype: TEXT_MSGTYPE.to_owned(), body: body.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    /// Command text handed to the sink.
    Dispatched(String),
    Warned,
    Ignored,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("agent failed to handle event: {0}")]
    Agent(#[from] anyhow::Error),
}

/// Where routed commands go. Implemented by the agent runtime.
#[async_trait]
pub trait CommandSink: Send + Sync {
    async fn command(&self, conversation_id: &str, text: &str) -> anyhow::Result<()>;
    async fn undecryptable(&self, conversation_id: &str) -> anyhow::Result<()>;
}

#[async_trait]
impl CommandSink for AgentRuntime {
    async fn command(&self, conversation_id: &str, text: &str) -> anyhow::Result<()> {
        self.handle_message(conversation_id, text).await
    }

    async fn undecryptable(&self, conversation_id: &str) -> anyhow::Result<()> {
        self.handle_undecryptable(conversation_id).await
    }
}

pub struct EventDispatcher {
    sink: Arc<dyn CommandSink>,
    bot_user_id: Option<String>,
}

impl EventDispatcher {
    pub fn new(sink: Arc<dyn CommandSink>, bot_user_id: Option<String>) -> Self {
        Self { sink, bot_user_id }
    }

    pub async fn dispatch(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        if self.bot_user_id.as_deref() == Some(envelope.sender.as_str()) {
            return Ok(HandlerResult::Ignored);
        }

        let command = match &envelope.event {
            ChatEvent::Message(message) if message.msgtype == TEXT_MSGTYPE => {
                emoji::translate_body(&message.body).to_owned()
            }
            ChatEvent::Reaction { key } => match emoji::command_for(key) {
                Some(command) => command.to_owned(),
                None => return Ok(HandlerResult::Ignored),
            },
            ChatEvent::Encrypted => {
                self.sink.undecryptable(&envelope.conversation_id).await?;
                return Ok(HandlerResult::Warned);
            }
            ChatEvent::Message(_) | ChatEvent::Unsupported { .. } => {
                return Ok(HandlerResult::Ignored);
            }
        };

        debug!(
            event_name = "ingress.chat.command_routed",
            correlation_id = %ctx.correlation_id,
            conversation_id = %envelope.conversation_id,
            "routing chat command"
        );
        self.sink.command(&envelope.conversation_id, &command).await?;
        Ok(HandlerResult::Dispatched(command))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::{
        ChatEnvelope, ChatEvent, CommandSink, EventContext, EventDispatcher, HandlerResult,
        MessageEvent,
    };

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("calls").clone()
        }
    }

    #[async_trait]
    impl CommandSink for RecordingSink {
        async fn command(&self, conversation_id: &str, text: &str) -> anyhow::Result<()> {
            self.calls.lock().expect("calls").push(format!("{conversation_id}:{text}"));
            Ok(())
        }

        async fn undecryptable(&self, conversation_id: &str) -> anyhow::Result<()> {
            self.calls.lock().expect("calls").push(format!("{conversation_id}:<encrypted>"));
            Ok(())
        }
    }

    fn envelope(sender: &str, event: ChatEvent) -> ChatEnvelope {
        ChatEnvelope {
            event_id: "$evt".to_owned(),
            conversation_id: "!room".to_owned(),
            sender: sender.to_owned(),
            event,
        }
    }

    fn dispatcher(sink: Arc<RecordingSink>) -> EventDispatcher {
        EventDispatcher::new(sink, Some("@swapdesk:example.org".to_owned()))
    }

    #[tokio::test]
    async fn text_messages_are_routed_with_emoji_translated() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher(sink.clone());

        let plain = envelope("@alice:example.org", ChatEvent::Message(MessageEvent::text("!news")));
        let emoji = envelope("@alice:example.org", ChatEvent::Message(MessageEvent::text("✅")));
        dispatcher.dispatch(&plain, &EventContext::default()).await.expect("plain");
        let result = dispatcher.dispatch(&emoji, &EventContext::default()).await.expect("emoji");

        assert_eq!(result, HandlerResult::Dispatched("!accept".to_owned()));
        assert_eq!(sink.calls(), vec!["!room:!news", "!room:!accept"]);
    }

    #[tokio::test]
    async fn reactions_route_only_known_shortcuts() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher(sink.clone());

        let known = envelope("@alice:example.org", ChatEvent::Reaction { key: "2️⃣".to_owned() });
        let unknown = envelope("@alice:example.org", ChatEvent::Reaction { key: "👍".to_owned() });
        dispatcher.dispatch(&known, &EventContext::default()).await.expect("known");
        let ignored = dispatcher.dispatch(&unknown, &EventContext::default()).await.expect("unknown");

        assert_eq!(ignored, HandlerResult::Ignored);
        assert_eq!(sink.calls(), vec!["!room:!slippage 2"]);
    }

    #[tokio::test]
    async fn own_messages_and_non_text_messages_are_ignored() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher(sink.clone());

        let own = envelope("@swapdesk:example.org", ChatEvent::Message(MessageEvent::text("!menu")));
        let image = envelope(
            "@alice:example.org",
            ChatEvent::Message(MessageEvent { msgtype: "m.image".to_owned(), body: "cat.png".to_owned() }),
        );

        for event in [own, image] {
            let result = dispatcher.dispatch(&event, &EventContext::default()).await.expect("dispatch");
            assert_eq!(result, HandlerResult::Ignored);
        }
        assert!(sink.calls().is_empty());
    }

    #[tokio::test]
    async fn encrypted_events_reach_the_warning_path() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher(sink.clone());

        let result = dispatcher
            .dispatch(&envelope("@alice:example.org", ChatEvent::Encrypted), &EventContext::default())
            .await
            .expect("dispatch");

        assert_eq!(result, HandlerResult::Warned);
        assert_eq!(sink.calls(), vec!["!room:<encrypted>"]);
    }
}
