//! Agent runtime: turns chat text into swap negotiation steps.
//!
//! The agent follows a fixed loop:
//! 1. **Parsing** (`intent`) - chat text to a [`intent::Command`], never failing
//! 2. **Guardrails** (`guardrails`) - decide which signing path an accept may take
//! 3. **Dispatch** (`runtime`) - quote, re-quote, execute or link to the signing page
//! 4. **Replies** (`reply`) - network-neutral replies handed to a [`reply::ConversationOutbox`]
//!
//! Commands for one conversation are handled strictly one at a time
//! (`conversation`). Pricing always comes from the quote engine; nothing the
//! user types can set a price or a minimum output.

pub mod conversation;
pub mod guardrails;
pub mod intent;
pub mod news;
pub mod reply;
pub mod runtime;

pub use intent::{parse, Command};
pub use reply::{ActionLink, AgentReply, ConversationOutbox, OutboxError, RecordingOutbox};
pub use runtime::{AgentRuntime, AgentSettings};
