//! Daemon command handlers (JSON-RPC).

use daqemon_api::{Ack, ScanStatus, ServiceStatus};
use daqemon_config::Config;

use crate::cli::{DaemonArgs, DaemonCommand, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

fn service_detail(s: &ServiceStatus) -> String {
    format!(
        "Enabled:  {}\nRunning:  {}",
        if s.enabled { "yes" } else { "no" },
        if s.running { "yes" } else { "no" }
    )
}

fn service_id(s: &ServiceStatus) -> String {
    if s.running { "running" } else { "stopped" }.into()
}

fn service(fmt: &OutputFormat, status: &ServiceStatus) -> String {
    output::render_single(fmt, status, service_detail, service_id)
}

fn scan_detail(s: &ScanStatus) -> String {
    let mut lines = vec![format!(
        "Scan:     {}",
        match s.done {
            Some(true) => "done",
            Some(false) => "in progress",
            None => "started",
        }
    )];
    if let Some(stat) = s.stat {
        lines.push(format!("Progress: {stat}"));
    }
    if !s.ids.is_empty() {
        let ids: Vec<String> = s.ids.iter().map(ToString::to_string).collect();
        lines.push(format!("Found:    {}", ids.join(", ")));
    }
    if let Some(ref message) = s.message {
        lines.push(format!("Message:  {message}"));
    }
    lines.join("\n")
}

/// Turn a refused acknowledgement into an error.
fn acknowledged(ack: Ack, what: &str) -> Result<(), CliError> {
    if ack.success {
        return Ok(());
    }
    Err(CliError::ApiError {
        message: ack.message.unwrap_or_else(|| format!("daemon refused to {what}")),
        status: None,
    })
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: DaemonArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let daemon = config::daemon(cfg)?;
    let fmt = &global.output;

    let out = match args.command {
        DaemonCommand::Status => service(fmt, &daemon.status().await?),
        DaemonCommand::Enable => service(fmt, &daemon.enable(true).await?),
        DaemonCommand::Disable => service(fmt, &daemon.enable(false).await?),
        DaemonCommand::Start => service(fmt, &daemon.start(true).await?),
        DaemonCommand::Stop => service(fmt, &daemon.start(false).await?),
        DaemonCommand::Restart => service(fmt, &daemon.restart().await?),

        DaemonCommand::Ports => {
            let ports = daemon.listports().await?;
            if !ports.success {
                return Err(CliError::ApiError {
                    message: ports.message.unwrap_or_else(|| "cannot list ports".into()),
                    status: None,
                });
            }
            output::render_single(
                fmt,
                &ports.ports,
                |p| p.join("\n"),
                |p| p.join("\n"),
            )
        }

        DaemonCommand::Queue => {
            let queue = daemon.queuelen().await?;
            output::render_single(
                fmt,
                &queue,
                |q| format!("Queued:   {}", q.queue),
                |q| q.queue.to_string(),
            )
        }

        DaemonCommand::Scan { interfaces, count } => {
            let scan = daemon.scan(interfaces.as_deref(), count).await?;
            output::render_single(fmt, &scan, scan_detail, |s| {
                s.ids
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }

        DaemonCommand::Erase => {
            if !util::confirm(
                "Erase the daemon configuration? This is destructive.",
                "daemon erase",
                global,
            )? {
                return Ok(());
            }
            acknowledged(daemon.erase().await?, "erase")?;
            if !global.quiet {
                eprintln!("Configuration erased");
            }
            String::new()
        }
    };

    output::print_output(&out, global.quiet);
    Ok(())
}
