// ── Reconciliation engine ──
//
// Idle ─preview─▶ Previewing ─apply─▶ Applying ─▶ Done
//   ▲                 │                              │
//   └────cancel───────┘◀──────────preview────────────┘
//
// The caller owns the `ReconcileContext` (node, channels, profile and the
// remote snapshot) and threads it through every call.

mod apply;
pub mod plan;
pub mod status;

use daqemon_api::EmonApi;
use tracing::{info, warn};

pub use plan::{Plan, PlannedAction};
pub use status::{ApplyReport, ResourceKind, StatusEvent, StatusSink};

use crate::error::{CoreError, ReconcileError};
use crate::model::{Channel, LocalConfig, Profile};
use crate::snapshot::RemoteSnapshot;
use crate::template::TemplateEngine;

/// Where a [`Reconciler`] is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Previewing,
    Applying,
    Done,
}

/// Everything one reconciliation reads and updates.
#[derive(Debug, Clone, Default)]
pub struct ReconcileContext {
    pub node: String,
    pub device_id: Option<i64>,
    pub channels: Vec<Channel>,
    pub profile: Profile,
    pub snapshot: RemoteSnapshot,
}

impl ReconcileContext {
    pub fn new(local: &LocalConfig, snapshot: RemoteSnapshot) -> Self {
        Self {
            node: local.client.nodeid.clone(),
            device_id: local.client.deviceid,
            channels: local.inputs.clone(),
            profile: local.client.profile(),
            snapshot,
        }
    }

    /// Fetch the remote snapshot for the configured node.
    pub async fn load(api: &EmonApi, local: &LocalConfig) -> Result<Self, CoreError> {
        if local.client.nodeid.is_empty() {
            return Err(ReconcileError::NoNode.into());
        }
        let snapshot = RemoteSnapshot::fetch(api, &local.client.nodeid).await?;
        Ok(Self::new(local, snapshot))
    }

    pub fn is_valid(&self) -> bool {
        self.device_id.is_some() && !self.channels.is_empty()
    }
}

/// Drives preview and apply against one server.
#[derive(Debug)]
pub struct Reconciler<'a> {
    api: &'a EmonApi,
    phase: Phase,
    plan: Option<Plan>,
}

impl<'a> Reconciler<'a> {
    pub fn new(api: &'a EmonApi) -> Self {
        Self {
            api,
            phase: Phase::Idle,
            plan: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The plan awaiting confirmation, if previewing.
    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    /// Build the desired set, diff it against the snapshot and hold the
    /// resulting plan for [`apply`](Self::apply).
    pub fn preview(&mut self, ctx: &ReconcileContext) -> Result<&Plan, CoreError> {
        if matches!(self.phase, Phase::Previewing | Phase::Applying) {
            return Err(ReconcileError::Busy { phase: self.phase }.into());
        }
        if ctx.node.is_empty() {
            return Err(ReconcileError::NoNode.into());
        }
        if ctx.channels.is_empty() {
            return Err(ReconcileError::NoChannels.into());
        }

        let desired = TemplateEngine::new(ctx.profile.clone()).build(&ctx.channels, &ctx.node)?;
        let plan = Plan::diff(desired, ctx);
        info!(
            new_inputs = plan.new_inputs.len(),
            inputs = plan.inputs.len(),
            feeds = plan.feeds.len(),
            "preview ready"
        );
        self.phase = Phase::Previewing;
        Ok(self.plan.insert(plan))
    }

    /// Discard the held plan and return to idle.
    pub fn cancel(&mut self) {
        if self.phase == Phase::Applying {
            warn!("abandoning an interrupted apply");
        }
        self.plan = None;
        self.phase = Phase::Idle;
    }

    /// Run the held plan: declare inputs, create feeds, attach processes.
    ///
    /// Per-item failures are reported through `sink` and the returned
    /// report; only misuse of the state machine is an error.
    pub async fn apply<S: StatusSink + ?Sized>(
        &mut self,
        ctx: &mut ReconcileContext,
        sink: &mut S,
    ) -> Result<ApplyReport, CoreError> {
        match self.phase {
            Phase::Previewing => {}
            Phase::Applying => return Err(ReconcileError::Busy { phase: self.phase }.into()),
            Phase::Idle | Phase::Done => return Err(ReconcileError::NothingPlanned.into()),
        }
        let plan = self.plan.take().ok_or(ReconcileError::NothingPlanned)?;

        self.phase = Phase::Applying;
        info!(node = %ctx.node, "applying");
        let report = apply::run(self.api, plan, ctx, sink).await;
        self.phase = Phase::Done;
        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::SecretString;
    use serde_json::json;

    use super::*;
    use crate::model::{RemoteFeed, RemoteInput, Unit};
    use crate::template::Action;

    fn api() -> EmonApi {
        let key: SecretString = "k".to_string().into();
        EmonApi::new(
            "http://127.0.0.1:9/",
            &key,
            daqemon_api::Endpoints::default(),
            &daqemon_api::TransportConfig::rest(),
        )
        .unwrap()
    }

    fn context() -> ReconcileContext {
        let mut power = Channel::from_device_input("m1", "powerA", Unit::Power);
        power.name = "p1".into();
        let mut energy = Channel::from_device_input("m1", "meter", Unit::Energy);
        energy.name = "e1".into();
        ReconcileContext {
            node: "emontx".into(),
            device_id: Some(3),
            channels: vec![power, energy],
            ..ReconcileContext::default()
        }
    }

    #[test]
    fn preview_against_empty_server_creates_everything() {
        let api = api();
        let mut rec = Reconciler::new(&api);
        let plan = rec.preview(&context()).unwrap();

        assert_eq!(plan.new_inputs.len(), 2);
        assert!(plan.inputs.is_empty());
        let feeds: Vec<&str> = plan.feeds.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(feeds, vec!["p1", "e1", "e1d"]);
        assert!(plan.preview.iter().all(|r| r.action == Action::Create));
        assert_eq!(rec.phase(), Phase::Previewing);
    }

    #[test]
    fn existing_feed_is_reused_with_note() {
        let api = api();
        let mut ctx = context();
        ctx.snapshot.feeds.push(RemoteFeed {
            id: Some(9),
            name: "p1".into(),
            unit: Some("kW".into()),
            engine: Some(0),
            ..RemoteFeed::default()
        });
        let mut rec = Reconciler::new(&api);
        let plan = rec.preview(&ctx).unwrap();

        assert!(!plan.feeds.iter().any(|f| f.name == "p1"));
        let row = plan.preview.iter().find(|r| r.name == "p1" && r.kind == ResourceKind::Feed).unwrap();
        assert_eq!(row.action, Action::Use);
        assert_eq!(row.note.as_deref(), Some("unit kW != W"));
    }

    #[test]
    fn matching_input_needs_no_update() {
        let api = api();
        let mut ctx = context();
        ctx.channels.truncate(1);
        ctx.snapshot.feeds.push(RemoteFeed {
            id: Some(12),
            name: "p1".into(),
            unit: Some("W".into()),
            engine: Some(0),
            ..RemoteFeed::default()
        });
        ctx.snapshot.processes = crate::model::ProcessCatalogue::from_value(json!({
            "process__log_to_feed": {"id_num": 1}
        }))
        .unwrap();
        ctx.snapshot.record_input(RemoteInput {
            id: Some(4),
            name: "p1".into(),
            process_list: Some("1:12".into()),
            ..RemoteInput::default()
        });

        let mut rec = Reconciler::new(&api);
        let plan = rec.preview(&ctx).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.preview.len(), 1);
        assert_eq!(plan.preview[0].action, Action::Use);
    }

    #[test]
    fn changed_input_is_updated_with_its_id() {
        let api = api();
        let mut ctx = context();
        ctx.channels.truncate(1);
        ctx.snapshot.record_input(RemoteInput {
            id: Some(4),
            name: "p1".into(),
            process_list: Some(String::new()),
            ..RemoteInput::default()
        });

        let mut rec = Reconciler::new(&api);
        let plan = rec.preview(&ctx).unwrap();
        assert_eq!(plan.inputs.len(), 1);
        assert_eq!(plan.inputs[0].id, 4);
        assert_eq!(plan.inputs[0].action, Action::Update);
        assert!(plan.new_inputs.is_empty());
    }

    #[test]
    fn state_machine_guards() {
        let api = api();
        let ctx = context();
        let mut rec = Reconciler::new(&api);

        rec.preview(&ctx).unwrap();
        let err = rec.preview(&ctx).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Reconcile(ReconcileError::Busy { phase: Phase::Previewing })
        ));

        rec.cancel();
        assert_eq!(rec.phase(), Phase::Idle);
        assert!(rec.plan().is_none());
    }

    #[tokio::test]
    async fn apply_without_preview_is_rejected() {
        let api = api();
        let mut ctx = context();
        let mut rec = Reconciler::new(&api);
        let err = rec.apply(&mut ctx, &mut ()).await.unwrap_err();
        assert!(matches!(err, CoreError::Reconcile(ReconcileError::NothingPlanned)));
    }

    #[test]
    fn empty_channels_or_node_rejected() {
        let api = api();
        let mut rec = Reconciler::new(&api);

        let mut ctx = context();
        ctx.channels.clear();
        assert!(matches!(
            rec.preview(&ctx).unwrap_err(),
            CoreError::Reconcile(ReconcileError::NoChannels)
        ));

        let mut ctx = context();
        ctx.node.clear();
        assert!(matches!(
            rec.preview(&ctx).unwrap_err(),
            CoreError::Reconcile(ReconcileError::NoNode)
        ));
    }
}
