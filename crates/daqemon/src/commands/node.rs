//! Node setup handlers.

use serde::Serialize;

use daqemon_config::Config;
use daqemon_core::{Registration, load_profile, register_node};

use crate::cli::{GlobalOpts, NodeArgs, NodeCommand};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util::or_dash;

/// What a registration run changed.
#[derive(Serialize)]
struct NodeSummary {
    node: String,
    registration: &'static str,
    device_id: Option<i64>,
    profile: Option<String>,
    engine: Option<i64>,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

fn outcome(registration: &Registration) -> (&'static str, Option<String>) {
    match registration {
        Registration::Created(_) => ("created", None),
        Registration::Updated(_) => ("updated", None),
        Registration::Adopted(_) => ("adopted", None),
        Registration::Cleared { message } => ("cleared", message.clone()),
    }
}

fn detail(s: &NodeSummary) -> String {
    let mut lines = vec![
        format!("Node:       {}", s.node),
        format!("Result:     {}", s.registration),
        format!("Device id:  {}", or_dash(s.device_id)),
        format!("Profile:    {}", or_dash(s.profile.as_deref())),
        format!("Engine:     {}", or_dash(s.engine)),
        format!("Valid:      {}", s.valid),
    ];
    if let Some(ref message) = s.message {
        lines.push(format!("Message:    {message}"));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: NodeArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        NodeCommand::Register { persist } => {
            let mut local = config::local_config(cfg)?;
            if local.client.nodeid.is_empty() {
                return Err(CliError::NoNode {
                    path: cfg.daemon.config_file.display().to_string(),
                });
            }
            let api = config::emon_api(cfg, global)?;

            let registration = register_node(&api, &mut local.client).await?;
            if let Some(kind) = local.client.kind.clone() {
                load_profile(&api, &kind, &mut local.client.meta).await?;
            }
            let valid = local.revalidate();

            let daemon = config::daemon(cfg)?;
            let saved = daemon
                .saveconfig(&serde_json::to_value(&local)?, persist)
                .await?;
            if !saved.success {
                return Err(CliError::ApiError {
                    message: saved
                        .message
                        .unwrap_or_else(|| "daemon rejected the configuration".into()),
                    status: None,
                });
            }

            let (label, message) = outcome(&registration);
            let summary = NodeSummary {
                node: local.client.nodeid.clone(),
                registration: label,
                device_id: registration.device_id(),
                profile: local.client.kind.clone(),
                engine: local.client.meta.engine,
                valid,
                message,
            };
            let out = output::render_single(&global.output, &summary, detail, |s| {
                or_dash(s.device_id)
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
