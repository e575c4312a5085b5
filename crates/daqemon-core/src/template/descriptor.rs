// ── Desired resource descriptors ──
//
// Typed form of substituted templates: what an input or feed should look
// like on the server. Field names follow the server's create arguments.

use serde::{Deserialize, Serialize};

use crate::model::{ProcessCatalogue, RemoteFeed};
use crate::process_list;

/// Placeholder id for a resource the server has not assigned one to yet.
pub const UNASSIGNED: i64 = -1;

/// Process argument type referencing a feed by id.
pub const FEED_ARGUMENT: i64 = 2;

/// What reconciliation will do with a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    #[default]
    Create,
    Update,
    Use,
}

/// Storage data type of a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedKind {
    #[serde(rename = "DataType::REALTIME")]
    Realtime,
    #[serde(rename = "DataType::DAILY")]
    Daily,
}

impl FeedKind {
    /// Numeric data type as the feed list reports it.
    pub fn datatype(self) -> i64 {
        match self {
            Self::Realtime => 1,
            Self::Daily => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessArgument {
    #[serde(rename = "type")]
    pub kind: i64,
    /// Name of the feed written to; resolved to a feed id on encoding.
    pub value: String,
}

/// One processing step attached to an input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessEntry {
    /// Remote method name.
    pub process: String,
    pub arguments: ProcessArgument,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDescriptor {
    pub name: String,
    pub node: String,
    pub description: String,
    #[serde(rename = "processList", default)]
    pub process_list: Vec<ProcessEntry>,
    #[serde(default)]
    pub action: Action,
    #[serde(default = "unassigned")]
    pub id: i64,
}

impl InputDescriptor {
    pub fn assigned_id(&self) -> Option<i64> {
        (self.id != UNASSIGNED).then_some(self.id)
    }

    /// Encode the attachment as `proc:feed` pairs against remote state.
    pub fn encode_process_list(&self, feeds: &[RemoteFeed], catalogue: &ProcessCatalogue) -> String {
        process_list::encode(&self.process_list, feeds, catalogue)
    }

    /// Names of the feeds this input's processes write to.
    pub fn feed_names(&self) -> impl Iterator<Item = &str> {
        self.process_list.iter().map(|p| p.arguments.value.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedOptions {
    pub interval: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedDescriptor {
    pub name: String,
    #[serde(default)]
    pub tag: String,
    #[serde(rename = "type")]
    pub kind: FeedKind,
    pub engine: i64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub action: Action,
    #[serde(default = "unassigned")]
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<FeedOptions>,
}

impl FeedDescriptor {
    pub fn assigned_id(&self) -> Option<i64> {
        (self.id != UNASSIGNED).then_some(self.id)
    }

    /// Differences in unit or engine against a same-named remote feed.
    pub fn shape_mismatch(&self, remote: &RemoteFeed) -> Option<String> {
        let mut diffs = Vec::new();
        if let Some(ref unit) = remote.unit {
            if *unit != self.unit {
                diffs.push(format!("unit {unit} != {}", self.unit));
            }
        }
        if let Some(engine) = remote.engine {
            if engine != self.engine {
                diffs.push(format!("engine {engine} != {}", self.engine));
            }
        }
        (!diffs.is_empty()).then(|| diffs.join(", "))
    }

    /// The remote record a successful create leaves behind.
    pub fn to_remote(&self, id: Option<i64>) -> RemoteFeed {
        RemoteFeed {
            id,
            name: self.name.clone(),
            tag: Some(self.tag.clone()),
            engine: Some(self.engine),
            unit: Some(self.unit.clone()),
            datatype: Some(self.kind.datatype()),
        }
    }
}

fn unassigned() -> i64 {
    UNASSIGNED
}

/// Desired inputs and feeds for a set of channels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DesiredSet {
    pub inputs: Vec<InputDescriptor>,
    pub feeds: Vec<FeedDescriptor>,
}

impl DesiredSet {
    /// Concatenate `other` onto this set, preserving order.
    pub fn merge(&mut self, other: DesiredSet) {
        self.inputs.extend(other.inputs);
        self.feeds.extend(other.feeds);
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.feeds.is_empty()
    }
}
