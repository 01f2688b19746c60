pub mod session;
pub mod swap;
pub mod ticket;
pub mod token;
