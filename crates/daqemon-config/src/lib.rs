//! Shared configuration for the DAQEMON command-line tools.
//!
//! TOML file + `DAQEMON_` environment overlay, API key resolution
//! (flag, env, keyring, plaintext), the local device configuration the
//! daemon persists, and translation into `daqemon-api` clients.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use daqemon_api::{
    AuthPolicy, DaemonClient, EmonApi, Endpoints, RpcClient, TlsMode, TransportConfig,
};
use daqemon_core::LocalConfig;

/// Keyring service name; entries are keyed by server host.
pub const KEYRING_SERVICE: &str = "daqemon";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no API key configured for server '{server}'")]
    NoCredentials { server: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("invalid local configuration {path}: {source}")]
    Local {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("client setup failed: {0}")]
    Client(#[from] daqemon_api::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonSection,

    #[serde(default)]
    pub server: ServerSection,
}

/// The local DAQEMON daemon.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DaemonSection {
    /// JSON-RPC endpoint.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// JSON-RPC ceiling, in seconds.
    #[serde(default = "default_rpc_timeout")]
    pub timeout: u64,

    /// Local device/channel configuration persisted by the daemon.
    #[serde(default = "default_config_file")]
    pub config_file: PathBuf,

    /// Pass a single object argument as named params.
    #[serde(default)]
    pub expand_single_object: bool,
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            timeout: default_rpc_timeout(),
            config_file: default_config_file(),
            expand_single_object: false,
        }
    }
}

fn default_rpc_url() -> String {
    "http://127.0.0.1/cgi-bin/luci/admin/daqemon/rpc".into()
}
fn default_rpc_timeout() -> u64 {
    10
}
fn default_config_file() -> PathBuf {
    PathBuf::from("/etc/daqemon/daqemon.json")
}

/// The Emoncms metering server.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerSection {
    #[serde(default = "default_server_url")]
    pub url: String,

    /// API key (plaintext; prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// REST ceiling, in seconds.
    #[serde(default = "default_rest_timeout")]
    pub timeout: u64,

    /// Accept invalid certificates (self-signed LAN servers).
    #[serde(default)]
    pub insecure: bool,

    /// Per-resource paths joined onto `url`.
    #[serde(default)]
    pub uri: Endpoints,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            api_key: None,
            api_key_env: None,
            timeout: default_rest_timeout(),
            insecure: false,
            uri: Endpoints::default(),
        }
    }
}

fn default_server_url() -> String {
    "https://emoncms.org/".into()
}
fn default_rest_timeout() -> u64 {
    2
}

impl ServerSection {
    /// Host part of the server URL, used as the keyring account.
    pub fn host(&self) -> Result<String, ConfigError> {
        let url = url::Url::parse(&self.url).map_err(|e| ConfigError::Validation {
            field: "server.url".into(),
            reason: format!("{e}: {}", self.url),
        })?;
        Ok(url.host_str().unwrap_or_default().to_owned())
    }

    pub fn transport(&self) -> TransportConfig {
        let tls = if self.insecure {
            TlsMode::DangerAcceptInvalid
        } else {
            TlsMode::System
        };
        TransportConfig::rest()
            .with_timeout(Duration::from_secs(self.timeout))
            .with_tls(tls)
    }

    /// Build the metering-server clients with `api_key`.
    pub fn emon_api(&self, api_key: &SecretString) -> Result<EmonApi, ConfigError> {
        Ok(EmonApi::new(&self.url, api_key, self.uri.clone(), &self.transport())?)
    }
}

impl DaemonSection {
    pub fn transport(&self) -> TransportConfig {
        TransportConfig::rpc().with_timeout(Duration::from_secs(self.timeout))
    }

    /// Build the typed daemon client.
    pub fn client(&self) -> Result<DaemonClient, ConfigError> {
        let url = url::Url::parse(&self.rpc_url).map_err(|e| ConfigError::Validation {
            field: "daemon.rpc_url".into(),
            reason: format!("{e}: {}", self.rpc_url),
        })?;
        let rpc = RpcClient::new(url, AuthPolicy::None, &self.transport())?
            .expand_single_object(self.expand_single_object);
        Ok(DaemonClient::new(rpc))
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("", "", "daqemon").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("daqemon");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the Config from `path` + environment. A missing file yields the
/// defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(env_overlay())
        .extract()?;
    debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// `DAQEMON_<SECTION>__<FIELD>` variables, e.g. `DAQEMON_DAEMON__RPC_URL`.
/// Variables without `__` (`DAQEMON_API_KEY`, `DAQEMON_RPC_URL`, ...) are
/// CLI flags and stay out of the file layer.
fn env_overlay() -> Env {
    Env::prefixed("DAQEMON_")
        .filter(|key| key.as_str().contains("__"))
        .split("__")
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to the canonical path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(cfg)?)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the API key: explicit flag, then `api_key_env`, then the
/// keyring entry for the server host, then plaintext.
pub fn resolve_api_key(server: &ServerSection, flag: Option<&str>) -> Result<SecretString, ConfigError> {
    if let Some(key) = flag.filter(|k| !k.is_empty()) {
        return Ok(SecretString::from(key.to_owned()));
    }

    if let Some(ref env_name) = server.api_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    let host = server.host()?;
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &host) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    if let Some(ref key) = server.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials { server: host })
}

/// Store the API key for the server host in the system keyring.
pub fn store_api_key(server: &ServerSection, key: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &server.host()?)?;
    entry.set_password(key)?;
    Ok(())
}

// ── Local device configuration ──────────────────────────────────────

/// Read the JSON document the daemon persists.
pub fn load_local_config(path: &Path) -> Result<LocalConfig, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Local {
        path: path.to_owned(),
        source,
    })
}
