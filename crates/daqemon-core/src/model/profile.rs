// ── Device profile ──
//
// A profile fixes the storage engine for new feeds and maps each
// processing step to a remote method. Profiles are fetched by device type
// and persisted into the local client section as `meta`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::IntoEnumIterator;

use super::channel::ProcessStep;

/// Steps whose method a fetched profile may override.
const OVERRIDABLE: [ProcessStep; 4] = [
    ProcessStep::Log,
    ProcessStep::LogJoin,
    ProcessStep::DailyUsage,
    ProcessStep::MultiRate,
];

/// Engine and step-to-method mapping used by the template engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub engine: i64,
    /// `None` means the step has no remote method.
    pub methods: BTreeMap<ProcessStep, Option<String>>,
}

impl Default for Profile {
    fn default() -> Self {
        let methods = ProcessStep::iter()
            .map(|step| (step, default_method(step).map(String::from)))
            .collect();
        Self { engine: 0, methods }
    }
}

fn default_method(step: ProcessStep) -> Option<&'static str> {
    match step {
        ProcessStep::Log => Some("process__log_to_feed"),
        ProcessStep::LogJoin => Some("process__log_to_feed_join"),
        ProcessStep::DailyUsage => Some("process__kwh_to_kwhd"),
        ProcessStep::MultiRate | ProcessStep::DailyCost => None,
    }
}

impl Profile {
    /// Build from stored metadata. A stored method table replaces the
    /// built-in one entirely; steps it omits have no method.
    pub fn from_meta(meta: &ProfileMeta) -> Self {
        let methods = match meta.processes {
            Some(ref stored) => ProcessStep::iter()
                .map(|step| {
                    let name: &'static str = step.into();
                    (step, stored.get(name).cloned().flatten())
                })
                .collect(),
            None => Self::default().methods,
        };
        Self {
            engine: meta.engine.unwrap_or(0),
            methods,
        }
    }

    pub fn method(&self, step: ProcessStep) -> Option<&str> {
        self.methods.get(&step).and_then(Option::as_deref)
    }
}

/// Profile metadata as stored in the local client section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processes: Option<BTreeMap<String, Option<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feeds: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ProfileMeta {
    /// Adopt the `meta` of a fetched profile document. A document without
    /// one clears the stored engine, methods and templates.
    pub fn adopt(&mut self, document: &Value) {
        let Some(meta) = document.get("meta").and_then(Value::as_object) else {
            self.engine = None;
            self.processes = None;
            self.feeds = None;
            self.inputs = None;
            return;
        };

        self.engine = meta.get("engine").and_then(daqemon_api::emon::value_as_id);
        if let Some(fetched) = meta.get("processes").and_then(Value::as_object) {
            let stored = self
                .processes
                .get_or_insert_with(|| Profile::default().stored_methods());
            for step in OVERRIDABLE {
                let name: &'static str = step.into();
                if let Some(method) = fetched.get(name) {
                    stored.insert(name.to_owned(), method.as_str().map(String::from));
                }
            }
        }
        self.feeds = meta.get("feeds").cloned();
        self.inputs = meta.get("inputs").cloned();
    }
}

impl Profile {
    /// The method table in its stored form.
    pub fn stored_methods(&self) -> BTreeMap<String, Option<String>> {
        self.methods
            .iter()
            .map(|(step, method)| (step.to_string(), method.clone()))
            .collect()
    }
}
