//! Metering-server inspection handlers.

use serde::Serialize;
use tabled::Tabled;

use daqemon_api::EmonApi;
use daqemon_config::Config;
use daqemon_core::{ProcessCatalogue, RemoteFeed, RemoteInput, server_version};

use crate::cli::{GlobalOpts, RemoteArgs, RemoteCommand};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util::or_dash;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct InputRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Process list")]
    process_list: String,
}

impl From<&RemoteInput> for InputRow {
    fn from(i: &RemoteInput) -> Self {
        Self {
            id: or_dash(i.id),
            node: or_dash(i.nodeid.as_deref()),
            name: i.name.clone(),
            process_list: i.process_list.clone().unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
struct FeedRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Tag")]
    tag: String,
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Engine")]
    engine: String,
}

impl From<&RemoteFeed> for FeedRow {
    fn from(f: &RemoteFeed) -> Self {
        Self {
            id: or_dash(f.id),
            name: f.name.clone(),
            tag: f.tag.clone().unwrap_or_default(),
            unit: f.unit.clone().unwrap_or_default(),
            engine: or_dash(f.engine),
        }
    }
}

/// One catalogue entry, flattened for output.
#[derive(Serialize)]
struct ProcessEntry {
    method: String,
    id: Option<i64>,
    name: Option<String>,
}

#[derive(Tabled)]
struct ProcessRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Method")]
    method: String,
    #[tabled(rename = "Name")]
    name: String,
}

impl From<&ProcessEntry> for ProcessRow {
    fn from(p: &ProcessEntry) -> Self {
        Self {
            id: or_dash(p.id),
            method: p.method.clone(),
            name: p.name.clone().unwrap_or_default(),
        }
    }
}

// ── Fetchers ────────────────────────────────────────────────────────

async fn inputs(api: &EmonApi, node: Option<&str>) -> Result<Vec<RemoteInput>, CliError> {
    let mut inputs: Vec<RemoteInput> = api.inputs.list().await?.decode()?;
    if let Some(node) = node {
        inputs.retain(|i| i.belongs_to(node));
    }
    Ok(inputs)
}

async fn processes(api: &EmonApi) -> Result<Vec<ProcessEntry>, CliError> {
    let catalogue = ProcessCatalogue::from_value(api.processes.list().await?.into_json()?)?;
    Ok(catalogue
        .iter()
        .map(|(method, info)| ProcessEntry {
            method: method.to_owned(),
            id: info.numeric_id(),
            name: info.name.clone(),
        })
        .collect())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: RemoteArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let api = config::emon_api(cfg, global)?;

    let out = match args.command {
        RemoteCommand::Inputs { node } => {
            let inputs = inputs(&api, node.as_deref()).await?;
            output::render_list(
                &global.output,
                &inputs,
                |i| InputRow::from(i),
                |i| i.name.clone(),
            )
        }

        RemoteCommand::Feeds => {
            let feeds: Vec<RemoteFeed> = api.feeds.list().await?.decode()?;
            output::render_list(
                &global.output,
                &feeds,
                |f| FeedRow::from(f),
                |f| f.name.clone(),
            )
        }

        RemoteCommand::Processes => {
            let entries = processes(&api).await?;
            output::render_list(
                &global.output,
                &entries,
                |p| ProcessRow::from(p),
                |p| p.method.clone(),
            )
        }

        RemoteCommand::Version => {
            let version = server_version(&api).await?;
            output::render_single(&global.output, &version, String::clone, String::clone)
        }
    };

    output::print_output(&out, global.quiet);
    Ok(())
}
