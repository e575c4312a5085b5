//! Template engine and reconciliation layer between `daqemon-api` and the
//! command-line front end.
//!
//! This crate turns the locally configured channels of a DAQEMON node into
//! inputs, feeds and process attachments on an Emoncms metering server:
//!
//! - **Domain model** ([`model`]): [`Channel`]s with their [`Unit`] and
//!   [`ProcessStep`]s, the device [`Profile`], the persisted
//!   [`LocalConfig`], and the server's [`RemoteInput`]s, [`RemoteFeed`]s
//!   and [`ProcessCatalogue`].
//!
//! - **[`TemplateEngine`]**: builds the desired inputs and feeds of each
//!   channel from JSON templates, then types them as
//!   [`InputDescriptor`]s and [`FeedDescriptor`]s.
//!
//! - **[`Reconciler`]**: diffs the desired set against a
//!   [`RemoteSnapshot`] into a [`Plan`], shows it as a preview, and on
//!   confirmation applies it in three sequential phases, reporting each
//!   item through a [`StatusSink`].
//!
//! - **Node setup** ([`node`]): registers the node resource and loads its
//!   profile meta.

pub mod error;
pub mod model;
pub mod node;
pub mod process_list;
pub mod reconcile;
pub mod snapshot;
pub mod template;

// ── Primary re-exports ──────────────────────────────────────────────
pub use error::{CoreError, ReconcileError};
pub use model::{
    Channel, ClientSection, InputClass, LocalConfig, ProcessCatalogue, ProcessStep, Profile,
    ProfileMeta, RemoteFeed, RemoteInput, Unit,
};
pub use node::{Registration, load_profile, register_node, server_version};
pub use reconcile::{
    ApplyReport, Phase, Plan, PlannedAction, ReconcileContext, Reconciler, ResourceKind,
    StatusEvent, StatusSink,
};
pub use snapshot::RemoteSnapshot;
pub use template::{
    Action, DesiredSet, FeedDescriptor, FeedKind, InputDescriptor, ProcessEntry, TemplateEngine,
};
