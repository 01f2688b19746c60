//! Chat Integration - messaging transport seam for the swap agent
//!
//! This crate connects a chat network to the agent runtime:
//! - **Events** (`events`) - inbound text, reactions and undecryptable events
//! - **Emoji** (`emoji`) - ✅ 🚫 🔙 and 1️⃣..5️⃣ shortcuts for the command grammar
//! - **Rendering** (`render`) - agent replies as plain text plus HTML with ticket links
//! - **Transport** (`transport`) - connection loop with reconnect policy
//!
//! # Architecture
//!
//! ```text
//! Chat Events → EventDispatcher → AgentRuntime → Quote Engine / Executor
//!                                      ↓
//!              ChatTransport ← TransportOutbox ← AgentReply
//! ```
//!
//! # Key Types
//!
//! - `ChatRunner` - event loop with reconnection logic
//! - `EventDispatcher` - filters and routes events to a `CommandSink`
//! - `TransportOutbox` - renders replies and sends them through the transport

pub mod emoji;
pub mod events;
pub mod outbox;
pub mod render;
pub mod transport;

pub use events::{ChatEnvelope, ChatEvent, CommandSink, EventDispatcher};
pub use outbox::TransportOutbox;
pub use render::{render, RenderedMessage};
pub use transport::{ChatRunner, ChatTransport, NoopChatTransport, ReconnectPolicy, TransportError};
