//! Config resolution for the CLI: file + environment from `daqemon-config`,
//! then global flag overrides, then client construction.

use daqemon_api::{DaemonClient, EmonApi};
use daqemon_config::Config;
use daqemon_core::LocalConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use daqemon_config::config_path;

/// Load the TOML config and apply the global flags on top.
pub fn resolve(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = daqemon_config::load_config()?;
    apply_overrides(&mut cfg, global);
    Ok(cfg)
}

fn apply_overrides(cfg: &mut Config, global: &GlobalOpts) {
    if let Some(ref url) = global.server {
        cfg.server.url.clone_from(url);
    }
    if let Some(ref url) = global.rpc_url {
        cfg.daemon.rpc_url.clone_from(url);
    }
    if let Some(ref path) = global.config_file {
        cfg.daemon.config_file.clone_from(path);
    }
    if global.insecure {
        cfg.server.insecure = true;
    }
    if let Some(timeout) = global.timeout.as_deref() {
        cfg.server.timeout = timeout.as_secs().max(1);
    }
}

/// Metering-server clients, with the API key resolved from flag, env,
/// keyring or file.
pub fn emon_api(cfg: &Config, global: &GlobalOpts) -> Result<EmonApi, CliError> {
    let key = daqemon_config::resolve_api_key(&cfg.server, global.api_key.as_deref())?;
    Ok(cfg.server.emon_api(&key)?)
}

pub fn daemon(cfg: &Config) -> Result<DaemonClient, CliError> {
    Ok(cfg.daemon.client()?)
}

/// The device/channel document the daemon persists.
pub fn local_config(cfg: &Config) -> Result<LocalConfig, CliError> {
    Ok(daqemon_config::load_local_config(&cfg.daemon.config_file)?)
}
