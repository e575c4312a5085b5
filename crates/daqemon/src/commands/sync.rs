//! Reconciliation command handlers: preview, confirm, apply.

use tabled::Tabled;
use tokio::sync::mpsc;

use daqemon_config::Config;
use daqemon_core::{
    ApplyReport, PlannedAction, ReconcileContext, Reconciler, StatusEvent,
};

use crate::cli::{GlobalOpts, OutputFormat, SyncArgs, SyncCommand};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Note")]
    note: String,
}

impl From<&PlannedAction> for PlanRow {
    fn from(a: &PlannedAction) -> Self {
        Self {
            action: a.action.to_string(),
            kind: a.kind.to_string(),
            name: a.name.clone(),
            note: a.note.clone().unwrap_or_default(),
        }
    }
}

fn status_line(event: &StatusEvent, color: bool) -> String {
    let kind = event.kind.to_string();
    let mut line = format!("{} {kind:<5} {}", output::mark(event.success, color), event.item);
    if let Some(ref message) = event.message {
        line.push_str(": ");
        line.push_str(message);
    }
    line
}

fn report_detail(report: &ApplyReport) -> String {
    let mut lines = vec![format!(
        "{} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    )];
    lines.extend(report.errors.iter().map(|e| format!("error: {e}")));
    lines.push(format!("Configuration valid: {}", report.valid));
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: SyncArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let path = cfg.daemon.config_file.clone();
    let local = config::local_config(cfg)?;
    let api = config::emon_api(cfg, global)?;

    let bar = util::spinner("Fetching remote state", global);
    let loaded = ReconcileContext::load(&api, &local).await;
    bar.finish_and_clear();
    let mut ctx = loaded.map_err(|e| CliError::from(e).with_local_path(&path))?;

    let mut reconciler = Reconciler::new(&api);
    let (rendered, nothing_to_do, changes) = {
        let plan = reconciler
            .preview(&ctx)
            .map_err(|e| CliError::from(e).with_local_path(&path))?;
        let rendered = output::render_list(
            &global.output,
            &plan.preview,
            |a| PlanRow::from(a),
            |a| format!("{} {} {}", a.action, a.kind, a.name),
        );
        let changes = plan.new_inputs.len() + plan.inputs.len() + plan.feeds.len();
        (rendered, plan.is_empty(), changes)
    };
    output::print_output(&rendered, global.quiet);

    match args.command {
        SyncCommand::Plan => {
            reconciler.cancel();
            Ok(())
        }
        SyncCommand::Apply => {
            if nothing_to_do {
                if !global.quiet {
                    eprintln!("Nothing to apply");
                }
                reconciler.cancel();
                return Ok(());
            }
            let prompt = format!("Apply {changes} change(s) to {}?", api.server());
            if !util::confirm(&prompt, "sync apply", global)? {
                reconciler.cancel();
                return Ok(());
            }

            let report = apply_streaming(&mut reconciler, &mut ctx, global).await?;
            let out = output::render_single(&global.output, &report, report_detail, |r| {
                format!("{} {}", r.succeeded(), r.failed())
            });
            match global.output {
                // Rows were streamed; the summary goes to stderr.
                OutputFormat::Table | OutputFormat::Plain => {
                    if !global.quiet {
                        eprintln!("{}", report_detail(&report));
                    }
                }
                _ => output::print_output(&out, global.quiet),
            }

            if report.has_failures() {
                return Err(CliError::PartialApply {
                    failed: report.failed() + report.errors.len(),
                    total: report.events.len() + report.errors.len(),
                });
            }
            Ok(())
        }
    }
}

/// Run the apply while printing each status event as it arrives.
async fn apply_streaming(
    reconciler: &mut Reconciler<'_>,
    ctx: &mut ReconcileContext,
    global: &GlobalOpts,
) -> Result<ApplyReport, CliError> {
    let (tx, mut rx) = mpsc::unbounded_channel::<StatusEvent>();
    let color = output::should_color(&global.color);
    let live = matches!(global.output, OutputFormat::Table | OutputFormat::Plain);

    let work = async {
        let mut sink = tx;
        reconciler.apply(ctx, &mut sink).await
    };
    let printer = async {
        while let Some(event) = rx.recv().await {
            if live {
                output::print_output(&status_line(&event, color), global.quiet);
            }
        }
    };
    let (report, ()) = tokio::join!(work, printer);
    Ok(report?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use daqemon_core::ResourceKind;

    use super::*;

    #[test]
    fn failed_status_line_carries_message() {
        let event = StatusEvent::failed(ResourceKind::Input, "power1", "Internal Server Error");
        assert_eq!(status_line(&event, false), "✗ input power1: Internal Server Error");
    }

    #[test]
    fn ok_status_line_is_padded() {
        let event = StatusEvent::ok(ResourceKind::Feed, "e1d");
        assert_eq!(status_line(&event, false), "✓ feed  e1d");
    }

    #[test]
    fn report_detail_lists_errors() {
        let report = ApplyReport {
            events: vec![StatusEvent::ok(ResourceKind::Feed, "p1")],
            errors: vec!["inputs: timeout".into()],
            valid: true,
        };
        assert_eq!(
            report_detail(&report),
            "1 succeeded, 0 failed\nerror: inputs: timeout\nConfiguration valid: true"
        );
    }
}
