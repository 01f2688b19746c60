use thiserror::Error;

use crate::chain::ChainError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid amount `{value}`: {reason}")]
    InvalidAmount { value: String, reason: &'static str },
    #[error("slippage of {0}% is outside 0..=100")]
    InvalidSlippage(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Failure modes of quoting, building and executing a swap.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SwapError {
    #[error("no route or quote available")]
    NoRouteAvailable,
    #[error("swap precondition failed: {reason}")]
    InsufficientAllowanceOrBalance { reason: String },
    #[error("no active quote in this conversation")]
    StaleSessionState,
    #[error("action link expired or already used")]
    TicketExpiredOrConsumed,
    #[error("transaction {tx_hash} was not mined before the confirmation wait ran out")]
    TransactionNotMined { tx_hash: String },
    #[error("transaction {tx_hash} reverted")]
    TransactionReverted { tx_hash: String },
    #[error("invalid quote: {0}")]
    InvalidQuote(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Chain(#[from] ChainError),
}

impl SwapError {
    /// Chat-facing wording. Never mentions internals beyond the failure reason.
    pub fn user_message(&self) -> String {
        match self {
            Self::NoRouteAvailable => {
                "No route or quote available right now. Try a different amount or pair.".to_string()
            }
            Self::StaleSessionState => {
                "No active quote yet. Say `!swap 0.5 ETH to USDC` first.".to_string()
            }
            Self::TicketExpiredOrConsumed => "Link expired.".to_string(),
            Self::TransactionNotMined { tx_hash } => {
                format!("Swap submitted and still pending. Track it with {tx_hash}.")
            }
            Self::InsufficientAllowanceOrBalance { reason } => format!("Swap failed: {reason}"),
            Self::TransactionReverted { tx_hash } => {
                format!("Swap failed: transaction {tx_hash} reverted.")
            }
            Self::InvalidQuote(reason) => format!("Swap failed: invalid quote, {reason}."),
            Self::Domain(error) => format!("Swap failed: {error}."),
            Self::Chain(error) => format!("Swap failed: {error}."),
        }
    }

    /// Pending transactions are not failures; callers report them with a tracking link.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::TransactionNotMined { .. })
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Persistence(message) | ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}

impl From<SwapError> for ApplicationError {
    fn from(value: SwapError) -> Self {
        match value {
            SwapError::Domain(error) => Self::Domain(error),
            SwapError::NoRouteAvailable | SwapError::Chain(_) => {
                Self::Integration(value.to_string())
            }
            other => Self::Domain(DomainError::InvariantViolation(other.to_string())),
        }
    }
}
