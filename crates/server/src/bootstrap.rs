use std::sync::Arc;

use alloy_primitives::Address;
use swapdesk_agent::{AgentRuntime, AgentSettings};
use swapdesk_chain::{custodial_client, ChainSetupError, HttpChainConnector};
use swapdesk_chat::{ChatRunner, ChatTransport, EventDispatcher, NoopChatTransport, ReconnectPolicy, TransportOutbox};
use swapdesk_core::config::{AppConfig, ConfigError, LoadOptions, SessionBackend};
use swapdesk_core::errors::SwapError;
use swapdesk_core::session::{InMemorySessionStore, SessionStore};
use swapdesk_core::swap::{ConfirmationPolicy, QuoteEngine, SwapExecutor};
use swapdesk_core::tickets::ActionTicketRegistry;
use swapdesk_db::{connect_with_config, migrations, DbPool, SqlSessionStore};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    /// Present only for the sqlite session backend.
    pub db_pool: Option<DbPool>,
    pub agent_runtime: Arc<AgentRuntime>,
    pub quote_engine: Arc<QuoteEngine>,
    pub chat_runner: ChatRunner,
    pub signer: Option<Address>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("chain client setup failed: {0}")]
    Chain(#[from] ChainSetupError),
    #[error("swap executor setup failed: {0}")]
    Executor(#[source] SwapError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        chain_id = config.chain.chain_id,
        "starting application bootstrap"
    );

    let (sessions, db_pool) = session_store(&config).await?;

    let quote_engine = Arc::new(QuoteEngine::from_config(Arc::new(HttpChainConnector), &config.chain));
    let executor = match custodial_client(&config)? {
        Some(client) => Some(Arc::new(
            SwapExecutor::new(
                client,
                ConfirmationPolicy::from_config(&config.chain),
                config.chain.rpc_timeout(),
            )
            .map_err(BootstrapError::Executor)?,
        )),
        None => None,
    };
    let signer = executor.as_ref().map(|executor| executor.signer());
    info!(
        event_name = "system.bootstrap.wallet_mode",
        correlation_id = "bootstrap",
        mode = if signer.is_some() { "custodial" } else { "client_signing" },
        signer = signer.map(|address| address.to_checksum(None)).unwrap_or_default(),
        "wallet mode resolved"
    );

    // No homeserver client ships in this build; replies are rendered and dropped.
    let transport: Arc<dyn ChatTransport> = Arc::new(NoopChatTransport);
    let mut runtime = AgentRuntime::new(
        sessions,
        Arc::new(ActionTicketRegistry::new()),
        quote_engine.clone(),
        Arc::new(TransportOutbox::new(transport.clone())),
        AgentSettings::from_config(&config),
    );
    if let Some(executor) = executor {
        runtime = runtime.with_executor(executor);
    }
    let agent_runtime = Arc::new(runtime);

    let dispatcher = EventDispatcher::new(agent_runtime.clone(), config.chat.bot_user_id.clone());
    let chat_runner = ChatRunner::new(transport, dispatcher, ReconnectPolicy::default());

    Ok(Application { config, db_pool, agent_runtime, quote_engine, chat_runner, signer })
}

async fn session_store(
    config: &AppConfig,
) -> Result<(Arc<dyn SessionStore>, Option<DbPool>), BootstrapError> {
    match config.session.backend {
        SessionBackend::Memory => Ok((Arc::new(InMemorySessionStore::new()), None)),
        SessionBackend::Sqlite => {
            let db_pool = connect_with_config(&config.database)
                .await
                .map_err(BootstrapError::DatabaseConnect)?;
            info!(
                event_name = "system.bootstrap.database_connected",
                correlation_id = "bootstrap",
                "database connection established"
            );

            migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
            info!(
                event_name = "system.bootstrap.migrations_applied",
                correlation_id = "bootstrap",
                "database migrations applied"
            );

            Ok((Arc::new(SqlSessionStore::new(db_pool.clone())), Some(db_pool)))
        }
    }
}
