use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use swapdesk_chain::load_signer;
use swapdesk_core::config::{AppConfig, LoadOptions};
use swapdesk_core::domain::token::short_address;
use toml::Value;

const UNSET: &str = "<unset>";

pub fn run(options: LoadOptions) -> String {
    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_key: &str| {
        field_source(key_path, env_key, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let chain = &config.chain;
    let entries: Vec<(&str, &str, String)> = vec![
        ("chain.chain_id", "SWAPDESK_CHAIN_ID", chain.chain_id.to_string()),
        ("chain.rpc_url", "SWAPDESK_CHAIN_RPC_URL", chain.rpc_url.clone()),
        (
            "chain.fallback_rpc_urls",
            "SWAPDESK_CHAIN_FALLBACK_RPC_URLS",
            chain.fallback_rpc_urls.join(","),
        ),
        ("chain.rpc_timeout_secs", "SWAPDESK_CHAIN_RPC_TIMEOUT_SECS", chain.rpc_timeout_secs.to_string()),
        (
            "chain.confirmation_poll_secs",
            "SWAPDESK_CHAIN_CONFIRMATION_POLL_SECS",
            chain.confirmation_poll_secs.to_string(),
        ),
        (
            "chain.confirmation_max_polls",
            "SWAPDESK_CHAIN_CONFIRMATION_MAX_POLLS",
            chain.confirmation_max_polls.to_string(),
        ),
        ("chain.explorer_tx_url", "SWAPDESK_CHAIN_EXPLORER_TX_URL", chain.explorer_tx_url.clone()),
        (
            "wallet.private_key",
            "SWAPDESK_WALLET_PRIVATE_KEY",
            redact_private_key(config.wallet.private_key.as_ref()),
        ),
        (
            "wallet.user_signing_mode",
            "SWAPDESK_WALLET_USER_SIGNING_MODE",
            config.wallet.user_signing_mode.to_string(),
        ),
        (
            "chat.homeserver_url",
            "SWAPDESK_CHAT_HOMESERVER_URL",
            config.chat.homeserver_url.clone().unwrap_or_else(|| UNSET.to_string()),
        ),
        (
            "chat.access_token",
            "SWAPDESK_CHAT_ACCESS_TOKEN",
            config.chat.access_token.as_ref().map_or_else(|| UNSET.to_string(), redact_token),
        ),
        (
            "chat.bot_user_id",
            "SWAPDESK_CHAT_BOT_USER_ID",
            config.chat.bot_user_id.clone().unwrap_or_else(|| UNSET.to_string()),
        ),
        ("server.bind_address", "SWAPDESK_SERVER_BIND_ADDRESS", config.server.bind_address.clone()),
        ("server.port", "SWAPDESK_SERVER_PORT", config.server.port.to_string()),
        (
            "server.app_base_url",
            "SWAPDESK_SERVER_APP_BASE_URL",
            config.server.app_base_url.clone().unwrap_or_else(|| UNSET.to_string()),
        ),
        (
            "server.graceful_shutdown_secs",
            "SWAPDESK_SERVER_GRACEFUL_SHUTDOWN_SECS",
            config.server.graceful_shutdown_secs.to_string(),
        ),
        ("session.backend", "SWAPDESK_SESSION_BACKEND", format!("{:?}", config.session.backend)),
        ("database.url", "SWAPDESK_DATABASE_URL", config.database.url.clone()),
        (
            "database.max_connections",
            "SWAPDESK_DATABASE_MAX_CONNECTIONS",
            config.database.max_connections.to_string(),
        ),
        ("database.timeout_secs", "SWAPDESK_DATABASE_TIMEOUT_SECS", config.database.timeout_secs.to_string()),
        ("logging.level", "SWAPDESK_LOGGING_LEVEL", config.logging.level.clone()),
        ("logging.format", "SWAPDESK_LOGGING_FORMAT", format!("{:?}", config.logging.format)),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(
        entries.into_iter().map(|(key, env_key, value)| render_line(key, &value, source(key, env_key))),
    );
    lines.push(format!("- derived.action_base_url = {}", config.server.action_base_url()));
    lines.push(format!(
        "- derived.wallet_mode = {}",
        if config.wallet.custodial_execution_enabled() { "custodial" } else { "client_signing" }
    ));

    lines.join("\n")
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from("swapdesk.toml"), PathBuf::from("config/swapdesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Shows which wallet the key controls, never the key itself.
fn redact_private_key(private_key: Option<&SecretString>) -> String {
    match private_key.map(load_signer) {
        None => UNSET.to_string(),
        Some(Ok(signer)) => format!("<redacted> (signer {})", short_address(signer.address())),
        Some(Err(_)) => "<redacted> (invalid key)".to_string(),
    }
}

fn redact_token(token: &SecretString) -> String {
    let trimmed = token.expose_secret().trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('_') {
        return format!("{prefix}_***");
    }

    "<redacted>".to_string()
}
