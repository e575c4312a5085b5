//! Config subcommand handlers.

use std::io::IsTerminal;

use dialoguer::{Input, Select};

use daqemon_config::{Config, save_config, store_api_key};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn require_terminal(action: &str) -> Result<(), CliError> {
    if std::io::stdin().is_terminal() {
        Ok(())
    } else {
        Err(CliError::Validation {
            field: "interactive".into(),
            reason: format!("'{action}' needs a terminal"),
        })
    }
}

fn prompt_key() -> Result<String, CliError> {
    let key = rpassword::prompt_password("API key: ").map_err(prompt_err)?;
    if key.is_empty() {
        return Err(CliError::Validation {
            field: "api_key".into(),
            reason: "API key cannot be empty".into(),
        });
    }
    Ok(key)
}

/// Copy of `cfg` safe to print.
fn redacted(cfg: &Config) -> Config {
    let mut shown = cfg.clone();
    if shown.server.api_key.is_some() {
        shown.server.api_key = Some("********".into());
    }
    shown
}

fn as_toml(cfg: &Config) -> String {
    toml::to_string_pretty(cfg).unwrap_or_else(|e| format!("<unserializable: {e}>"))
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = redacted(&config::resolve(global)?);
            let out = output::render_single(&global.output, &cfg, as_toml, as_toml);
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::SetKey => {
            let cfg = config::resolve(global)?;
            let key = match global.api_key {
                Some(ref key) => key.clone(),
                None => {
                    require_terminal("config set-key")?;
                    prompt_key()?
                }
            };
            store_api_key(&cfg.server, &key)?;
            if !global.quiet {
                eprintln!("API key stored in system keyring for {}", cfg.server.host()?);
            }
            Ok(())
        }

        ConfigCommand::Init => init(global),
    }
}

// ── Init: interactive wizard ─────────────────────────────────────────

fn init(global: &GlobalOpts) -> Result<(), CliError> {
    require_terminal("config init")?;
    let mut cfg = config::resolve(global)?;
    eprintln!("DAQEMON configuration wizard");
    eprintln!("   Config path: {}\n", config::config_path().display());

    cfg.server.url = Input::new()
        .with_prompt("Emoncms server URL")
        .default(cfg.server.url.clone())
        .interact_text()
        .map_err(prompt_err)?;

    let key = prompt_key()?;
    let store_choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let store_selection = Select::new()
        .with_prompt("Where to store the API key?")
        .items(store_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;
    if store_selection == 0 {
        store_api_key(&cfg.server, &key)?;
        cfg.server.api_key = None;
        eprintln!("   API key stored in system keyring");
    } else {
        cfg.server.api_key = Some(key);
    }

    cfg.daemon.rpc_url = Input::new()
        .with_prompt("Daemon JSON-RPC URL")
        .default(cfg.daemon.rpc_url.clone())
        .interact_text()
        .map_err(prompt_err)?;

    let local: String = Input::new()
        .with_prompt("Local device configuration file")
        .default(cfg.daemon.config_file.display().to_string())
        .interact_text()
        .map_err(prompt_err)?;
    cfg.daemon.config_file = local.into();

    let path = save_config(&cfg)?;
    if !global.quiet {
        eprintln!("\nConfiguration written to {}", path.display());
    }
    Ok(())
}
