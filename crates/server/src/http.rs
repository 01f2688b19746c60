use axum::Router;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::actions::{self, ActionsState};
use crate::bootstrap::Application;
use crate::health::{self, HealthState};
use crate::signing::{self, SigningState};

pub fn router(app: &Application) -> Router {
    health::router(HealthState {
        session_backend: app.config.session.backend,
        db_pool: app.db_pool.clone(),
        signer: app.signer,
    })
    .merge(actions::router(ActionsState { runtime: app.agent_runtime.clone() }))
    .merge(signing::router(SigningState::new(
        app.quote_engine.clone(),
        app.config.chain.chain_id,
        app.config.chain.explorer_tx_url.clone(),
    )))
}

/// Binds and serves `router` until `shutdown` flips to `true`.
pub async fn spawn(
    bind_address: &str,
    port: u16,
    router: Router,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<JoinHandle<()>> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.http.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "http endpoints started"
    );

    Ok(tokio::spawn(async move {
        let signal = async move {
            while !*shutdown.borrow_and_update() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        };
        if let Err(error) = axum::serve(listener, router).with_graceful_shutdown(signal).await {
            error!(
                event_name = "system.http.error",
                correlation_id = "bootstrap",
                error = %error,
                "http server terminated unexpectedly"
            );
        }
    }))
}
