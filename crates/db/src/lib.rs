pub mod connection;
pub mod migrations;
pub mod sessions;

pub use connection::{connect, connect_with_config, connect_with_settings, DbPool};
pub use sessions::{SessionRepositoryError, SqlSessionStore};
