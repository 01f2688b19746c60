use std::sync::Arc;

use serde::Serialize;
use swapdesk_chain::{load_signer, HttpChainConnector};
use swapdesk_core::chain::{with_timeout, ChainConnector};
use swapdesk_core::config::{AppConfig, LoadOptions, SessionBackend};
use swapdesk_db::connect_with_config;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
pub struct DoctorCheck {
    pub name: &'static str,
    pub status: CheckStatus,
    pub details: String,
}

#[derive(Debug, Serialize)]
pub struct DoctorReport {
    pub overall_status: CheckStatus,
    pub summary: String,
    pub checks: Vec<DoctorCheck>,
}

const CHECKS_AFTER_CONFIG: [&str; 3] = ["rpc_reachability", "wallet_mode", "database_connectivity"];

pub fn run(options: LoadOptions, json_output: bool) -> CommandResult {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "doctor",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let report = runtime.block_on(build_report(AppConfig::load(options), Arc::new(HttpChainConnector)));
    let exit_code = if report.overall_status == CheckStatus::Fail { 1 } else { 0 };

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult { exit_code, output };
    }

    CommandResult { exit_code, output: render_human(&report) }
}

pub async fn build_report(
    config: Result<AppConfig, swapdesk_core::config::ConfigError>,
    connector: Arc<dyn ChainConnector>,
) -> DoctorReport {
    let mut checks = Vec::new();

    match config {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_rpc_reachability(&config, connector.as_ref()).await);
            checks.push(check_wallet_mode(&config));
            checks.push(check_database_connectivity(&config).await);
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.extend(CHECKS_AFTER_CONFIG.iter().map(|name| DoctorCheck {
                name,
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            }));
        }
    }

    let any_failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if any_failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if any_failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

/// Passes when at least one endpoint answers `eth_blockNumber`.
async fn check_rpc_reachability(config: &AppConfig, connector: &dyn ChainConnector) -> DoctorCheck {
    let endpoints = config.chain.endpoints();
    let mut reachable = Vec::new();
    let mut failures = Vec::new();

    for endpoint in &endpoints {
        let probe = match connector.connect(endpoint) {
            Ok(client) => {
                with_timeout("block_number", config.chain.rpc_timeout(), client.block_number()).await
            }
            Err(error) => Err(error),
        };
        match probe {
            Ok(block) => reachable.push(format!("{endpoint} (block {block})")),
            Err(error) => failures.push(format!("{endpoint}: {error}")),
        }
    }

    if reachable.is_empty() {
        return DoctorCheck {
            name: "rpc_reachability",
            status: CheckStatus::Fail,
            details: format!("no rpc endpoint answered; {}", failures.join("; ")),
        };
    }

    DoctorCheck {
        name: "rpc_reachability",
        status: CheckStatus::Pass,
        details: format!("{}/{} endpoints reachable: {}", reachable.len(), endpoints.len(), reachable.join(", ")),
    }
}

fn check_wallet_mode(config: &AppConfig) -> DoctorCheck {
    if config.wallet.custodial_execution_enabled() {
        if let Some(private_key) = &config.wallet.private_key {
            return match load_signer(private_key) {
                Ok(signer) => DoctorCheck {
                    name: "wallet_mode",
                    status: CheckStatus::Pass,
                    details: format!("custodial execution from {}", signer.address()),
                },
                Err(error) => {
                    DoctorCheck { name: "wallet_mode", status: CheckStatus::Fail, details: error.to_string() }
                }
            };
        }
    }

    if config.server.app_base_url.is_some() {
        return DoctorCheck {
            name: "wallet_mode",
            status: CheckStatus::Pass,
            details: format!("client signing via {}/sign/swap", config.server.action_base_url()),
        };
    }

    DoctorCheck {
        name: "wallet_mode",
        status: CheckStatus::Fail,
        details: "no wallet key and no server.app_base_url; accepted quotes cannot be signed".to_string(),
    }
}

async fn check_database_connectivity(config: &AppConfig) -> DoctorCheck {
    if config.session.backend == SessionBackend::Memory {
        return DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Skipped,
            details: "session.backend is memory".to_string(),
        };
    }

    match connect_with_config(&config.database).await {
        Ok(pool) => {
            pool.close().await;
            DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Pass,
                details: format!("connected using `{}`", config.database.url),
            }
        }
        Err(error) => DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Fail,
            details: format!("failed to connect to database: {error}"),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
