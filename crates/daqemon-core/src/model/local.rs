// ── Local device configuration ──
//
// The object the daemon persists: a `client` section identifying the node
// on the metering server, the configured channels, and whatever else the
// daemon owns (interfaces, devices, server settings), carried untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::channel::Channel;
use super::profile::{Profile, ProfileMeta};

/// Node identity and profile as stored in the `client` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientSection {
    /// Node name used when submitting input values.
    #[serde(default, deserialize_with = "nodeid_as_string")]
    pub nodeid: String,
    /// Server-assigned id of the node resource, once registered.
    #[serde(
        default,
        deserialize_with = "deviceid_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub deviceid: Option<i64>,
    /// Profile (device template) type.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub meta: ProfileMeta,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn nodeid_as_string<'de, D: serde::Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn deviceid_lenient<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(daqemon_api::emon::value_as_id(&Value::deserialize(d)?).filter(|id| *id != 0))
}

impl ClientSection {
    pub fn profile(&self) -> Profile {
        Profile::from_meta(&self.meta)
    }
}

/// The whole local configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalConfig {
    #[serde(default)]
    pub client: ClientSection,
    #[serde(default)]
    pub inputs: Vec<Channel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl LocalConfig {
    /// A configuration is valid once its node is registered and it has at
    /// least one channel.
    pub fn is_valid(&self) -> bool {
        self.client.deviceid.is_some() && !self.inputs.is_empty()
    }

    /// Recompute and store [`is_valid`](Self::is_valid).
    pub fn revalidate(&mut self) -> bool {
        let valid = self.is_valid();
        self.valid = Some(valid);
        valid
    }
}
