// ── Apply sequence ──
//
// a. declare new inputs by submitting their names, then bind their ids
//    from a fresh input list;
// b. create missing feeds one by one;
// c. set the process list of every changed or newly bound input.
//
// A failed item is reported and the sequence moves on.

use daqemon_api::{BatchEvent, EmonApi, Payload};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::ReconcileContext;
use super::plan::Plan;
use super::status::{ApplyReport, ResourceKind, StatusEvent, StatusSink};
use crate::template::UNASSIGNED;

/// Forwards events to the sink and keeps them for the report.
struct Recorder<'s, S: StatusSink + ?Sized> {
    sink: &'s mut S,
    report: ApplyReport,
}

impl<S: StatusSink + ?Sized> Recorder<'_, S> {
    fn emit(&mut self, event: StatusEvent) {
        if !event.success {
            warn!(kind = %event.kind, item = %event.item, message = ?event.message, "apply item failed");
        }
        self.report.events.push(event.clone());
        self.sink.emit(event);
    }

    fn error(&mut self, message: String) {
        warn!("{message}");
        self.report.errors.push(message);
    }
}

/// Read a write acknowledgement. Text bodies are reparsed; a bare `ok`
/// counts as success.
pub(crate) fn acknowledged(payload: Payload) -> Result<(), String> {
    let value = match payload {
        Payload::Text(text) if text.trim().eq_ignore_ascii_case("ok") => return Ok(()),
        other => other.into_json().map_err(|e| e.to_string())?,
    };
    match value {
        Value::Object(ref map) if map.get("success").and_then(Value::as_bool) == Some(true) => Ok(()),
        Value::Object(map) => Err(map
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("rejected")
            .to_owned()),
        other => Err(other.to_string()),
    }
}

pub(super) async fn run<S: StatusSink + ?Sized>(
    api: &EmonApi,
    mut plan: Plan,
    ctx: &mut ReconcileContext,
    sink: &mut S,
) -> ApplyReport {
    let mut rec = Recorder {
        sink,
        report: ApplyReport::default(),
    };

    declare_inputs(api, &mut plan, ctx, &mut rec).await;
    create_feeds(api, &mut plan, ctx, &mut rec).await;
    attach_processes(api, &plan, ctx, &mut rec).await;

    rec.report.valid = ctx.is_valid();
    info!(
        succeeded = rec.report.succeeded(),
        failed = rec.report.failed(),
        valid = rec.report.valid,
        "apply finished"
    );
    rec.report
}

async fn declare_inputs<S: StatusSink + ?Sized>(
    api: &EmonApi,
    plan: &mut Plan,
    ctx: &mut ReconcileContext,
    rec: &mut Recorder<'_, S>,
) {
    if plan.new_inputs.is_empty() {
        return;
    }
    let names: Map<String, Value> = plan
        .new_inputs
        .iter()
        .map(|i| (i.name.clone(), Value::Null))
        .collect();
    info!(count = names.len(), node = %ctx.node, "declaring inputs");

    match api.submit(&ctx.node, &Value::Object(names)).await {
        Ok(payload) => {
            if let Err(message) = acknowledged(payload) {
                rec.error(format!("declare inputs: {message}"));
            }
        }
        Err(e) => rec.error(format!("declare inputs: {e}")),
    }

    let listed = match api.inputs.list().await {
        Ok(payload) => ctx.snapshot.absorb_inputs(payload, &ctx.node).map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    if let Err(message) = listed {
        for input in &plan.new_inputs {
            rec.emit(StatusEvent::failed(ResourceKind::Input, &input.name, message.clone()));
        }
        return;
    }

    for input in &mut plan.new_inputs {
        match ctx.snapshot.listed_input(&input.name, &ctx.node).cloned() {
            Some(remote) => {
                input.id = remote.id.unwrap_or(UNASSIGNED);
                debug!(input = %input.name, id = ?remote.id, "input declared");
                ctx.snapshot.record_input(remote);
                rec.emit(StatusEvent::ok(ResourceKind::Input, &input.name));
            }
            None => rec.emit(StatusEvent::failed(
                ResourceKind::Input,
                &input.name,
                "not listed after submit",
            )),
        }
    }
}

async fn create_feeds<S: StatusSink + ?Sized>(
    api: &EmonApi,
    plan: &mut Plan,
    ctx: &mut ReconcileContext,
    rec: &mut Recorder<'_, S>,
) {
    if plan.feeds.is_empty() {
        return;
    }
    info!(count = plan.feeds.len(), "creating feeds");

    let snapshot = &mut ctx.snapshot;
    let outcomes = api
        .feeds
        .create_all(&plan.feeds, |event| {
            let BatchEvent::Item { entity, outcome, .. } = event else {
                return;
            };
            if outcome.success {
                snapshot.record_feed(entity.to_remote(outcome.id));
                rec.emit(StatusEvent::ok(ResourceKind::Feed, &entity.name));
            } else {
                let message = outcome.message.as_deref().unwrap_or("create failed");
                rec.emit(StatusEvent::failed(ResourceKind::Feed, &entity.name, message));
            }
        })
        .await;

    for (feed, outcome) in plan.feeds.iter_mut().zip(outcomes) {
        if let Some(id) = outcome.id.filter(|_| outcome.success) {
            feed.id = id;
        }
    }
}

async fn attach_processes<S: StatusSink + ?Sized>(
    api: &EmonApi,
    plan: &Plan,
    ctx: &mut ReconcileContext,
    rec: &mut Recorder<'_, S>,
) {
    let bound_new = plan.new_inputs.iter().filter(|i| i.assigned_id().is_some());
    for input in plan.inputs.iter().chain(bound_new) {
        let Some(id) = input.assigned_id() else {
            rec.emit(StatusEvent::failed(ResourceKind::Input, &input.name, "no input id"));
            continue;
        };
        let encoded = input.encode_process_list(&ctx.snapshot.feeds, &ctx.snapshot.processes);
        debug!(input = %input.name, id, processlist = %encoded, "setting process list");

        let result = match api.set_process_list(id, &encoded).await {
            Ok(payload) => acknowledged(payload),
            Err(e) => Err(e.to_string()),
        };
        match result {
            Ok(()) => {
                if let Some(remote) = ctx.snapshot.inputs.get_mut(&input.name) {
                    remote.process_list = Some(encoded);
                }
                rec.emit(StatusEvent::ok(ResourceKind::Input, &input.name));
                for feed in input.feed_names() {
                    rec.emit(StatusEvent::ok(ResourceKind::Feed, feed));
                }
            }
            Err(message) => {
                rec.emit(StatusEvent::failed(ResourceKind::Input, &input.name, message.clone()));
                for feed in input.feed_names() {
                    rec.emit(StatusEvent::failed(ResourceKind::Feed, feed, message.clone()));
                }
            }
        }
    }
}
