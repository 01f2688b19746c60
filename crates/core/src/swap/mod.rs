pub mod builder;
pub mod executor;
pub mod quote;

pub use builder::{min_amount_out, BuiltSwap, Recipient, SwapBuilder};
pub use executor::{ConfirmationPolicy, ExecutionReceipt, SwapExecutor};
pub use quote::{GasHint, QuoteEngine};
