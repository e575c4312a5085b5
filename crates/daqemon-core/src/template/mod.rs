// ── Template engine ──
//
// Builds the desired inputs and feeds for configured channels. Templates
// are JSON trees with `{0}` (channel name), `{1}` (channel tag) and `{2}`
// (node id) placeholders; a `Null` branch is inapplicable and disappears
// on substitution.

pub mod descriptor;
pub mod subst;

use serde_json::{Value, json};
use tracing::trace;

pub use descriptor::{
    Action, DesiredSet, FEED_ARGUMENT, FeedDescriptor, FeedKind, FeedOptions, InputDescriptor,
    ProcessArgument, ProcessEntry, UNASSIGNED,
};
pub use subst::substitute;

use crate::error::CoreError;
use crate::model::{Channel, ProcessStep, Profile, Unit};

/// Engine used by every feed when the profile sets none.
pub const DEFAULT_ENGINE: i64 = 0;
/// Engine with native daily storage.
pub const DAILY_ENGINE: i64 = 11;
/// Fallback engine for daily feeds on profiles without native daily storage.
pub const PHPTIMESERIES: i64 = 2;
/// Interval of fallback daily feeds, in seconds.
pub const DAILY_INTERVAL: u32 = 86_400;

const REALTIME: &str = "DataType::REALTIME";
const DAILY: &str = "DataType::DAILY";

/// Produces input and feed templates for one profile.
#[derive(Debug, Clone, Default)]
pub struct TemplateEngine {
    profile: Profile,
}

impl TemplateEngine {
    pub fn new(profile: Profile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Input template: name, node, description and one process entry per
    /// step. Steps without a remote method are `Null`.
    pub fn input_template(&self, unit: Unit, steps: &[String]) -> Value {
        let process_list: Vec<Value> = steps
            .iter()
            .map(|name| self.process_template(name.parse().ok()))
            .collect();
        json!({
            "name": "{0}",
            "node": "{2}",
            "description": unit.description(),
            "processList": process_list,
            "action": "create",
            "id": UNASSIGNED,
        })
    }

    fn process_template(&self, step: Option<ProcessStep>) -> Value {
        let Some(step) = step else {
            return Value::Null;
        };
        match self.profile.method(step) {
            Some(method) => json!({
                "process": method,
                "arguments": {"type": FEED_ARGUMENT, "value": format!("{{0}}{}", step.feed_suffix())},
            }),
            None => Value::Null,
        }
    }

    /// One feed template per step, `Null` where the step has no feed.
    pub fn feed_templates(&self, unit: Unit, steps: &[String]) -> Value {
        Value::Array(
            steps
                .iter()
                .map(|name| {
                    name.parse()
                        .map_or(Value::Null, |step| self.feed_template(unit, step))
                })
                .collect(),
        )
    }

    /// Feed template for a single step.
    pub fn feed_template(&self, unit: Unit, step: ProcessStep) -> Value {
        if self.profile.method(step).is_none() {
            return Value::Null;
        }
        let engine = self.profile.engine;
        let symbol = unit.symbol();
        match step {
            ProcessStep::Log | ProcessStep::LogJoin => json!({
                "name": "{0}",
                "tag": "{1}",
                "type": REALTIME,
                "engine": engine,
                "unit": symbol,
                "action": "create",
                "id": UNASSIGNED,
            }),
            ProcessStep::DailyUsage if engine == DAILY_ENGINE => json!({
                "name": "{0}d",
                "tag": "{1}",
                "type": DAILY,
                "engine": DAILY_ENGINE,
                "unit": format!("{symbol}d"),
                "action": "create",
                "id": UNASSIGNED,
            }),
            ProcessStep::DailyUsage => json!({
                "name": "{0}d",
                "tag": "{1}",
                "type": DAILY,
                "engine": PHPTIMESERIES,
                "unit": format!("{symbol}d"),
                "action": "create",
                "id": UNASSIGNED,
                "options": {"interval": DAILY_INTERVAL},
            }),
            ProcessStep::MultiRate => json!({
                "name": "{0}r",
                "tag": "{1}",
                "type": REALTIME,
                "engine": engine,
                "unit": format!("{symbol}d"),
                "action": "create",
                "id": UNASSIGNED,
            }),
            ProcessStep::DailyCost => Value::Null,
        }
    }

    /// Desired input and feeds of one channel under `node`.
    pub fn build_channel(&self, channel: &Channel, node: &str) -> Result<DesiredSet, CoreError> {
        let args = [channel.name.as_str(), channel.tag.as_str(), node];
        let mut set = DesiredSet::default();

        if let Some(input) = substitute(&self.input_template(channel.unit, &channel.processes), &args) {
            set.inputs.push(typed(input, &channel.name)?);
        }
        if let Some(feeds) = substitute(&self.feed_templates(channel.unit, &channel.processes), &args) {
            set.feeds = typed(feeds, &channel.name)?;
        }
        trace!(channel = %channel.name, feeds = set.feeds.len(), "built channel");
        Ok(set)
    }

    /// Desired inputs and feeds of every channel, in channel order.
    pub fn build(&self, channels: &[Channel], node: &str) -> Result<DesiredSet, CoreError> {
        let mut set = DesiredSet::default();
        for channel in channels {
            set.merge(self.build_channel(channel, node)?);
        }
        Ok(set)
    }
}

fn typed<T: serde::de::DeserializeOwned>(value: Value, channel: &str) -> Result<T, CoreError> {
    serde_json::from_value(value).map_err(|e| CoreError::Template {
        message: format!("{channel}: {e}"),
    })
}
