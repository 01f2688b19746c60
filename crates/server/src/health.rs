use alloy_primitives::Address;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use swapdesk_core::config::SessionBackend;
use swapdesk_db::DbPool;

#[derive(Clone)]
pub struct HealthState {
    pub session_backend: SessionBackend,
    /// Checked on every probe when sessions are durable.
    pub db_pool: Option<DbPool>,
    pub signer: Option<Address>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub wallet: HealthCheck,
    pub session_backend: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let session_backend = session_check(&state).await;
    let ready = session_backend.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "swapdesk-server runtime initialized".to_string(),
        },
        wallet: wallet_check(state.signer),
        session_backend,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn wallet_check(signer: Option<Address>) -> HealthCheck {
    match signer {
        Some(address) => HealthCheck {
            status: "ready",
            detail: format!("custodial execution from {}", address.to_checksum(None)),
        },
        None => HealthCheck { status: "ready", detail: "client signing only".to_string() },
    }
}

async fn session_check(state: &HealthState) -> HealthCheck {
    match (state.session_backend, &state.db_pool) {
        (SessionBackend::Memory, _) => {
            HealthCheck { status: "ready", detail: "in-memory sessions".to_string() }
        }
        (SessionBackend::Sqlite, None) => {
            HealthCheck { status: "degraded", detail: "sqlite sessions without a pool".to_string() }
        }
        (SessionBackend::Sqlite, Some(pool)) => {
            match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
                Ok(_) => HealthCheck { status: "ready", detail: "sqlite query succeeded".to_string() },
                Err(error) => HealthCheck {
                    status: "degraded",
                    detail: format!("sqlite query failed: {error}"),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::address;
    use axum::{extract::State, http::StatusCode, Json};
    use swapdesk_core::config::SessionBackend;
    use swapdesk_db::connect_with_settings;

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn memory_sessions_report_ready_with_client_signing() {
        let state = HealthState { session_backend: SessionBackend::Memory, db_pool: None, signer: None };

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.wallet.detail, "client signing only");
        assert_eq!(payload.session_backend.detail, "in-memory sessions");
    }

    #[tokio::test]
    async fn sqlite_sessions_report_ready_when_database_is_reachable() {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 5)
            .await
            .expect("pool should connect");
        let state = HealthState {
            session_backend: SessionBackend::Sqlite,
            db_pool: Some(pool.clone()),
            signer: Some(address!("00000000000000000000000000000000000000aa")),
        };

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.session_backend.status, "ready");
        assert!(payload.wallet.detail.starts_with("custodial execution from 0x"));

        pool.close().await;
    }

    #[tokio::test]
    async fn closed_database_degrades_health() {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 5)
            .await
            .expect("pool should connect");
        pool.close().await;
        let state =
            HealthState { session_backend: SessionBackend::Sqlite, db_pool: Some(pool), signer: None };

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.service.status, "ready");
    }
}
