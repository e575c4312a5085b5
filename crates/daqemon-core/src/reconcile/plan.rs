// ── Diff: desired set against the remote snapshot ──

use serde::Serialize;
use tracing::{debug, warn};

use super::ReconcileContext;
use super::status::ResourceKind;
use crate::process_list;
use crate::template::{Action, DesiredSet, FeedDescriptor, InputDescriptor, UNASSIGNED};

/// One row of the preview shown before applying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedAction {
    pub name: String,
    pub kind: ResourceKind,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Work for one apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    /// Inputs the server does not know yet.
    pub new_inputs: Vec<InputDescriptor>,
    /// Existing inputs whose process attachment differs.
    pub inputs: Vec<InputDescriptor>,
    /// Feeds to create.
    pub feeds: Vec<FeedDescriptor>,
    pub preview: Vec<PlannedAction>,
}

impl Plan {
    /// Compare `desired` with the cached remote state.
    ///
    /// Feeds are matched by name only; a same-named feed of a different
    /// unit or engine is reused and the difference noted.
    pub fn diff(desired: DesiredSet, ctx: &ReconcileContext) -> Self {
        let snapshot = &ctx.snapshot;
        let mut plan = Self::default();

        for mut input in desired.inputs {
            let Some(remote) = snapshot.input(&input.name) else {
                input.action = Action::Create;
                plan.row(&input.name, ResourceKind::Input, Action::Create, None);
                plan.new_inputs.push(input);
                continue;
            };
            input.id = remote.id.unwrap_or(UNASSIGNED);
            let encoded = input.encode_process_list(&snapshot.feeds, &snapshot.processes);
            if process_list::differs(&encoded, remote.process_list.as_deref()) {
                debug!(input = %input.name, desired = %encoded, remote = ?remote.process_list, "process list differs");
                input.action = Action::Update;
                plan.row(&input.name, ResourceKind::Input, Action::Update, None);
                plan.inputs.push(input);
            }
        }

        for feed in desired.feeds {
            match snapshot.feed(&feed.name) {
                Some(remote) => {
                    let note = feed.shape_mismatch(remote);
                    if let Some(ref diff) = note {
                        warn!(feed = %feed.name, %diff, "reusing feed of a different shape");
                    }
                    plan.row(&feed.name, ResourceKind::Feed, Action::Use, note);
                }
                None => {
                    plan.row(&feed.name, ResourceKind::Feed, Action::Create, None);
                    plan.feeds.push(feed);
                }
            }
        }
        plan
    }

    fn row(&mut self, name: &str, kind: ResourceKind, action: Action, note: Option<String>) {
        self.preview.push(PlannedAction {
            name: name.to_owned(),
            kind,
            action,
            note,
        });
    }

    /// True when applying would write nothing.
    pub fn is_empty(&self) -> bool {
        self.new_inputs.is_empty() && self.inputs.is_empty() && self.feeds.is_empty()
    }
}
