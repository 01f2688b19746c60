use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_RPC_URL: &str = "https://1rpc.io/eth";

pub const DEFAULT_FALLBACK_RPC_URLS: [&str; 5] = [
    "https://ethereum.publicnode.com",
    "https://rpc.ankr.com/eth",
    "https://rpc.builder0x69.io",
    "https://eth.llamarpc.com",
    "https://cloudflare-eth.com",
];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub chain: ChainConfig,
    pub wallet: WalletConfig,
    pub chat: ChatConfig,
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub rpc_url: String,
    pub fallback_rpc_urls: Vec<String>,
    pub rpc_timeout_secs: u64,
    pub confirmation_poll_secs: u64,
    pub confirmation_max_polls: u32,
    pub explorer_tx_url: String,
}

#[derive(Clone, Debug)]
pub struct WalletConfig {
    pub private_key: Option<SecretString>,
    pub user_signing_mode: bool,
}

#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub homeserver_url: Option<String>,
    pub access_token: Option<SecretString>,
    pub bot_user_id: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub app_base_url: Option<String>,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub backend: SessionBackend,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionBackend {
    Memory,
    Sqlite,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub rpc_url: Option<String>,
    pub chain_id: Option<u64>,
    pub user_signing_mode: Option<bool>,
    pub app_base_url: Option<String>,
    pub session_backend: Option<SessionBackend>,
    pub database_url: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chain: ChainConfig {
                chain_id: 1,
                rpc_url: DEFAULT_RPC_URL.to_string(),
                fallback_rpc_urls: DEFAULT_FALLBACK_RPC_URLS
                    .iter()
                    .map(|url| url.to_string())
                    .collect(),
                rpc_timeout_secs: 10,
                confirmation_poll_secs: 3,
                confirmation_max_polls: 60,
                explorer_tx_url: "https://etherscan.io/tx/".to_string(),
            },
            wallet: WalletConfig { private_key: None, user_signing_mode: false },
            chat: ChatConfig { homeserver_url: None, access_token: None, bot_user_id: None },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                app_base_url: None,
                graceful_shutdown_secs: 15,
            },
            session: SessionConfig { backend: SessionBackend::Memory },
            database: DatabaseConfig {
                url: "sqlite://swapdesk.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl ChainConfig {
    /// Primary endpoint first, then the fallbacks, without duplicates.
    pub fn endpoints(&self) -> Vec<String> {
        let mut endpoints: Vec<String> = Vec::with_capacity(self.fallback_rpc_urls.len() + 1);
        for url in std::iter::once(&self.rpc_url).chain(self.fallback_rpc_urls.iter()) {
            let url = url.trim();
            if !url.is_empty() && !endpoints.iter().any(|known| known == url) {
                endpoints.push(url.to_string());
            }
        }
        endpoints
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn confirmation_poll_interval(&self) -> Duration {
        Duration::from_secs(self.confirmation_poll_secs)
    }
}

impl WalletConfig {
    /// Whether accepted quotes are executed with the configured key.
    pub fn custodial_execution_enabled(&self) -> bool {
        self.private_key.is_some() && !self.user_signing_mode
    }
}

impl ServerConfig {
    pub fn action_base_url(&self) -> String {
        match &self.app_base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("http://localhost:{}", self.port),
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for SessionBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(ConfigError::Validation(format!(
                "unsupported session backend `{other}` (expected memory|sqlite)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("swapdesk.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(chain) = patch.chain {
            if let Some(chain_id) = chain.chain_id {
                self.chain.chain_id = chain_id;
            }
            if let Some(rpc_url) = chain.rpc_url {
                self.chain.rpc_url = rpc_url;
            }
            if let Some(fallback_rpc_urls) = chain.fallback_rpc_urls {
                self.chain.fallback_rpc_urls = fallback_rpc_urls;
            }
            if let Some(rpc_timeout_secs) = chain.rpc_timeout_secs {
                self.chain.rpc_timeout_secs = rpc_timeout_secs;
            }
            if let Some(confirmation_poll_secs) = chain.confirmation_poll_secs {
                self.chain.confirmation_poll_secs = confirmation_poll_secs;
            }
            if let Some(confirmation_max_polls) = chain.confirmation_max_polls {
                self.chain.confirmation_max_polls = confirmation_max_polls;
            }
            if let Some(explorer_tx_url) = chain.explorer_tx_url {
                self.chain.explorer_tx_url = explorer_tx_url;
            }
        }

        if let Some(wallet) = patch.wallet {
            if let Some(private_key) = wallet.private_key {
                self.wallet.private_key = Some(secret_value(private_key));
            }
            if let Some(user_signing_mode) = wallet.user_signing_mode {
                self.wallet.user_signing_mode = user_signing_mode;
            }
        }

        if let Some(chat) = patch.chat {
            if let Some(homeserver_url) = chat.homeserver_url {
                self.chat.homeserver_url = Some(homeserver_url);
            }
            if let Some(access_token) = chat.access_token {
                self.chat.access_token = Some(secret_value(access_token));
            }
            if let Some(bot_user_id) = chat.bot_user_id {
                self.chat.bot_user_id = Some(bot_user_id);
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(app_base_url) = server.app_base_url {
                self.server.app_base_url = Some(app_base_url);
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(session) = patch.session {
            if let Some(backend) = session.backend {
                self.session.backend = backend;
            }
        }

        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SWAPDESK_CHAIN_ID") {
            self.chain.chain_id = parse_u64("SWAPDESK_CHAIN_ID", &value)?;
        }
        if let Some(value) = read_env("SWAPDESK_CHAIN_RPC_URL") {
            self.chain.rpc_url = value;
        }
        if let Some(value) = read_env("SWAPDESK_CHAIN_FALLBACK_RPC_URLS") {
            self.chain.fallback_rpc_urls = value
                .split(',')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(value) = read_env("SWAPDESK_CHAIN_RPC_TIMEOUT_SECS") {
            self.chain.rpc_timeout_secs = parse_u64("SWAPDESK_CHAIN_RPC_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("SWAPDESK_CHAIN_CONFIRMATION_POLL_SECS") {
            self.chain.confirmation_poll_secs =
                parse_u64("SWAPDESK_CHAIN_CONFIRMATION_POLL_SECS", &value)?;
        }
        if let Some(value) = read_env("SWAPDESK_CHAIN_CONFIRMATION_MAX_POLLS") {
            self.chain.confirmation_max_polls =
                parse_u32("SWAPDESK_CHAIN_CONFIRMATION_MAX_POLLS", &value)?;
        }
        if let Some(value) = read_env("SWAPDESK_CHAIN_EXPLORER_TX_URL") {
            self.chain.explorer_tx_url = value;
        }

        if let Some(value) = read_env("SWAPDESK_WALLET_PRIVATE_KEY") {
            self.wallet.private_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("SWAPDESK_WALLET_USER_SIGNING_MODE") {
            self.wallet.user_signing_mode =
                parse_bool("SWAPDESK_WALLET_USER_SIGNING_MODE", &value)?;
        }

        if let Some(value) = read_env("SWAPDESK_CHAT_HOMESERVER_URL") {
            self.chat.homeserver_url = Some(value);
        }
        if let Some(value) = read_env("SWAPDESK_CHAT_ACCESS_TOKEN") {
            self.chat.access_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("SWAPDESK_CHAT_BOT_USER_ID") {
            self.chat.bot_user_id = Some(value);
        }

        if let Some(value) = read_env("SWAPDESK_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SWAPDESK_SERVER_PORT") {
            self.server.port = parse_u16("SWAPDESK_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("SWAPDESK_SERVER_APP_BASE_URL") {
            self.server.app_base_url = Some(value);
        }
        if let Some(value) = read_env("SWAPDESK_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("SWAPDESK_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("SWAPDESK_SESSION_BACKEND") {
            self.session.backend = value.parse()?;
        }

        if let Some(value) = read_env("SWAPDESK_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("SWAPDESK_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("SWAPDESK_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("SWAPDESK_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("SWAPDESK_DATABASE_TIMEOUT_SECS", &value)?;
        }

        let log_level =
            read_env("SWAPDESK_LOGGING_LEVEL").or_else(|| read_env("SWAPDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SWAPDESK_LOGGING_FORMAT").or_else(|| read_env("SWAPDESK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(rpc_url) = overrides.rpc_url {
            self.chain.rpc_url = rpc_url;
        }
        if let Some(chain_id) = overrides.chain_id {
            self.chain.chain_id = chain_id;
        }
        if let Some(user_signing_mode) = overrides.user_signing_mode {
            self.wallet.user_signing_mode = user_signing_mode;
        }
        if let Some(app_base_url) = overrides.app_base_url {
            self.server.app_base_url = Some(app_base_url);
        }
        if let Some(session_backend) = overrides.session_backend {
            self.session.backend = session_backend;
        }
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_chain(&self.chain)?;
        validate_wallet(&self.wallet)?;
        validate_chat(&self.chat)?;
        validate_server(&self.server)?;
        validate_database(&self.database)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("swapdesk.toml"), PathBuf::from("config/swapdesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn is_http_url(value: &str) -> bool {
    let value = value.trim();
    value.starts_with("http://") || value.starts_with("https://")
}

fn validate_chain(chain: &ChainConfig) -> Result<(), ConfigError> {
    if chain.chain_id == 0 {
        return Err(ConfigError::Validation(
            "chain.chain_id must be greater than zero".to_string(),
        ));
    }

    if !is_http_url(&chain.rpc_url) {
        return Err(ConfigError::Validation(
            "chain.rpc_url must start with http:// or https://".to_string(),
        ));
    }

    if let Some(bad) = chain.fallback_rpc_urls.iter().find(|url| !is_http_url(url)) {
        return Err(ConfigError::Validation(format!(
            "chain.fallback_rpc_urls entry `{bad}` must start with http:// or https://"
        )));
    }

    if chain.rpc_timeout_secs == 0 || chain.rpc_timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "chain.rpc_timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    if chain.confirmation_poll_secs == 0 || chain.confirmation_poll_secs > 60 {
        return Err(ConfigError::Validation(
            "chain.confirmation_poll_secs must be in range 1..=60".to_string(),
        ));
    }

    if chain.confirmation_max_polls == 0 {
        return Err(ConfigError::Validation(
            "chain.confirmation_max_polls must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_wallet(wallet: &WalletConfig) -> Result<(), ConfigError> {
    let Some(private_key) = &wallet.private_key else {
        return Ok(());
    };

    let key = private_key.expose_secret().trim();
    let hex = key.strip_prefix("0x").unwrap_or(key);
    if hex.len() != 64 || !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(ConfigError::Validation(
            "wallet.private_key must be 32 bytes of hex (optionally prefixed with 0x)".to_string(),
        ));
    }

    Ok(())
}

fn validate_chat(chat: &ChatConfig) -> Result<(), ConfigError> {
    if let Some(homeserver_url) = &chat.homeserver_url {
        if !is_http_url(homeserver_url) {
            return Err(ConfigError::Validation(
                "chat.homeserver_url must start with http:// or https://".to_string(),
            ));
        }
        let missing_token = chat
            .access_token
            .as_ref()
            .map(|token| token.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if missing_token {
            return Err(ConfigError::Validation(
                "chat.access_token is required when chat.homeserver_url is set".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    if let Some(base_url) = &server.app_base_url {
        if !is_http_url(base_url) {
            return Err(ConfigError::Validation(
                "server.app_base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    chain: Option<ChainPatch>,
    wallet: Option<WalletPatch>,
    chat: Option<ChatPatch>,
    server: Option<ServerPatch>,
    session: Option<SessionPatch>,
    database: Option<DatabasePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ChainPatch {
    chain_id: Option<u64>,
    rpc_url: Option<String>,
    fallback_rpc_urls: Option<Vec<String>>,
    rpc_timeout_secs: Option<u64>,
    confirmation_poll_secs: Option<u64>,
    confirmation_max_polls: Option<u32>,
    explorer_tx_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WalletPatch {
    private_key: Option<String>,
    user_signing_mode: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatPatch {
    homeserver_url: Option<String>,
    access_token: Option<String>,
    bot_user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    app_base_url: Option<String>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionPatch {
    backend: Option<SessionBackend>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{
        AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, SessionBackend,
    };

    const TEST_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_load_without_a_config_file() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.chain.chain_id == 1, "mainnet should be the default chain")?;
        ensure(config.chain.rpc_timeout_secs == 10, "rpc attempts should time out after 10s")?;
        ensure(
            !config.wallet.custodial_execution_enabled(),
            "custodial execution needs a configured key",
        )?;
        ensure(
            config.server.action_base_url() == "http://localhost:8080",
            "action links should fall back to localhost",
        )?;
        ensure(
            matches!(config.session.backend, SessionBackend::Memory),
            "sessions should default to memory",
        )
    }

    #[test]
    fn endpoints_put_primary_first_and_skip_duplicates() -> Result<(), String> {
        let mut config = AppConfig::default();
        config.chain.rpc_url = "https://eth.llamarpc.com".to_string();

        let endpoints = config.chain.endpoints();

        ensure(endpoints[0] == "https://eth.llamarpc.com", "primary endpoint should lead")?;
        ensure(
            endpoints.iter().filter(|url| url.as_str() == "https://eth.llamarpc.com").count() == 1,
            "duplicate endpoints should be dropped",
        )?;
        ensure(endpoints.len() == 5, "remaining fallbacks should be kept in order")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_SWAPDESK_KEY", TEST_KEY);
        env::set_var("TEST_SWAPDESK_RPC", "https://rpc.example.org");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("swapdesk.toml");
            fs::write(
                &path,
                r#"
[chain]
rpc_url = "${TEST_SWAPDESK_RPC}"

[wallet]
private_key = "${TEST_SWAPDESK_KEY}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.chain.rpc_url == "https://rpc.example.org",
                "rpc url should be interpolated from environment",
            )?;
            ensure(
                config.wallet.private_key.as_ref().map(|key| key.expose_secret() == TEST_KEY)
                    == Some(true),
                "private key should be interpolated from environment",
            )?;
            ensure(
                config.wallet.custodial_execution_enabled(),
                "a configured key enables custodial execution",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_SWAPDESK_KEY", "TEST_SWAPDESK_RPC"]);
        result
    }

    #[test]
    fn missing_interpolation_variable_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("swapdesk.toml");
        fs::write(&path, "[chain]\nrpc_url = \"${SWAPDESK_TEST_UNSET_VAR}\"\n")
            .map_err(|err| err.to_string())?;

        match AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() }) {
            Err(ConfigError::MissingEnvInterpolation { var }) => {
                ensure(var == "SWAPDESK_TEST_UNSET_VAR", "error should name the variable")
            }
            Err(other) => Err(format!("unexpected error: {other}")),
            Ok(_) => Err("expected interpolation failure".to_string()),
        }
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SWAPDESK_LOG_LEVEL", "warn");
        env::set_var("SWAPDESK_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["SWAPDESK_LOG_LEVEL", "SWAPDESK_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SWAPDESK_CHAIN_RPC_URL", "https://from-env.example.org");
        env::set_var("SWAPDESK_WALLET_USER_SIGNING_MODE", "1");
        env::set_var("SWAPDESK_CHAIN_FALLBACK_RPC_URLS", "https://a.example.org, https://b.example.org");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("swapdesk.toml");
            fs::write(
                &path,
                r#"
[chain]
rpc_url = "https://from-file.example.org"
rpc_timeout_secs = 5

[database]
url = "sqlite://from-file.db"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.chain.rpc_url == "https://from-env.example.org",
                "env rpc url should win over file and defaults",
            )?;
            ensure(config.chain.rpc_timeout_secs == 5, "file timeout should win over default")?;
            ensure(config.wallet.user_signing_mode, "env flag should enable user signing mode")?;
            ensure(
                config.chain.fallback_rpc_urls
                    == vec!["https://a.example.org".to_string(), "https://b.example.org".to_string()],
                "fallback list should be split on commas",
            )?;
            Ok(())
        })();

        clear_vars(&[
            "SWAPDESK_CHAIN_RPC_URL",
            "SWAPDESK_WALLET_USER_SIGNING_MODE",
            "SWAPDESK_CHAIN_FALLBACK_RPC_URLS",
        ]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SWAPDESK_WALLET_PRIVATE_KEY", "not-a-key");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("wallet.private_key")
            );
            ensure(has_message, "validation failure should mention wallet.private_key")
        })();

        clear_vars(&["SWAPDESK_WALLET_PRIVATE_KEY"]);
        result
    }

    #[test]
    fn invalid_numeric_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SWAPDESK_CHAIN_RPC_TIMEOUT_SECS", "ten");

        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::InvalidEnvOverride { key, .. }) => ensure(
                key == "SWAPDESK_CHAIN_RPC_TIMEOUT_SECS",
                "error should name the offending variable",
            ),
            Err(other) => Err(format!("unexpected error: {other}")),
            Ok(_) => Err("expected invalid override error".to_string()),
        };

        clear_vars(&["SWAPDESK_CHAIN_RPC_TIMEOUT_SECS"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SWAPDESK_WALLET_PRIVATE_KEY", TEST_KEY);
        env::set_var("SWAPDESK_CHAT_HOMESERVER_URL", "https://matrix.example.org");
        env::set_var("SWAPDESK_CHAT_ACCESS_TOKEN", "syt-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains(&TEST_KEY[2..]), "debug output should not contain the key")?;
            ensure(
                !debug.contains("syt-secret-value"),
                "debug output should not contain the access token",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&[
            "SWAPDESK_WALLET_PRIVATE_KEY",
            "SWAPDESK_CHAT_HOMESERVER_URL",
            "SWAPDESK_CHAT_ACCESS_TOKEN",
        ]);
        result
    }
}
