pub mod chain;
pub mod config;
pub mod domain;
pub mod errors;
pub mod session;
pub mod swap;
pub mod tickets;
pub mod units;

pub use chain::{ChainClient, ChainConnector, ChainError, TransactionCall, TxReceipt};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
pub use domain::session::ConversationSession;
pub use domain::swap::{FeeTier, Quote, QuoteSummary, RawQuote, SwapRequest};
pub use domain::ticket::{ActionTicket, TicketCommand};
pub use domain::token::{Token, TokenPair, TokenRegistry};
pub use errors::{ApplicationError, DomainError, InterfaceError, SwapError};
pub use session::{InMemorySessionStore, SessionStore};
pub use swap::{BuiltSwap, QuoteEngine, Recipient, SwapBuilder, SwapExecutor};
pub use tickets::ActionTicketRegistry;
