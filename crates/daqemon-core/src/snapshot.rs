// ── Remote snapshot ──
//
// Cached view of the node's inputs, all feeds and the process catalogue.
// The diff reads it; the apply sequence writes newly created resources
// back into it so later phases resolve their ids.

use daqemon_api::{EmonApi, Payload};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::error::CoreError;
use crate::model::{ProcessCatalogue, RemoteFeed, RemoteInput};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteSnapshot {
    /// The node's inputs, keyed by name.
    pub inputs: IndexMap<String, RemoteInput>,
    /// Every input the server knows, across nodes.
    pub input_list: Vec<RemoteInput>,
    pub feeds: Vec<RemoteFeed>,
    pub processes: ProcessCatalogue,
}

/// A payload the caller can work with, or a decode error naming `what`.
fn structured(payload: Payload, what: &str) -> Result<Value, CoreError> {
    match payload {
        Payload::Json(Value::Null) => Err(CoreError::Decode {
            message: format!("{what}: empty response"),
        }),
        Payload::Json(value) => Ok(value),
        Payload::Text(text) => Err(CoreError::Decode {
            message: format!("{what}: {}", text.trim()),
        }),
    }
}

impl RemoteSnapshot {
    /// Load the node's inputs, the input list, feeds and the process
    /// catalogue.
    pub async fn fetch(api: &EmonApi, node: &str) -> Result<Self, CoreError> {
        let mut snapshot = Self::default();
        snapshot.absorb_inputs(api.node_inputs(node).await?, node)?;
        snapshot.absorb_inputs(api.inputs.list().await?, node)?;
        snapshot.feeds = serde_json::from_value(structured(api.feeds.list().await?, "feeds")?)?;
        snapshot.processes =
            ProcessCatalogue::from_value(structured(api.processes.list().await?, "processes")?)?;
        debug!(
            inputs = snapshot.inputs.len(),
            feeds = snapshot.feeds.len(),
            processes = snapshot.processes.len(),
            "remote snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Take in an inputs response: an array replaces the flat list, an
    /// object the node's map. Ids are then copied from list entries of
    /// `node` into same-named map entries.
    pub fn absorb_inputs(&mut self, payload: Payload, node: &str) -> Result<(), CoreError> {
        match structured(payload, "inputs")? {
            Value::Array(items) => {
                self.input_list = items
                    .into_iter()
                    .filter(Value::is_object)
                    .map(serde_json::from_value::<RemoteInput>)
                    .collect::<Result<Vec<_>, _>>()?;
            }
            Value::Object(map) => {
                // An unknown node answers with a failure object.
                if map.get("success").and_then(Value::as_bool) == Some(false) {
                    self.inputs.clear();
                } else {
                    self.inputs = map
                        .into_iter()
                        .filter(|(_, v)| v.is_object())
                        .map(|(name, v)| {
                            let mut input: RemoteInput = serde_json::from_value(v)?;
                            input.name.clone_from(&name);
                            Ok((name, input))
                        })
                        .collect::<Result<_, serde_json::Error>>()?;
                }
            }
            other => {
                return Err(CoreError::Decode {
                    message: format!("inputs: unexpected {other}"),
                });
            }
        }
        self.link_input_ids(node);
        Ok(())
    }

    fn link_input_ids(&mut self, node: &str) {
        for listed in self.input_list.iter().filter(|i| i.belongs_to(node)) {
            if let Some(input) = self.inputs.get_mut(&listed.name) {
                input.id = listed.id;
                if input.nodeid.is_none() {
                    input.nodeid.clone_from(&listed.nodeid);
                }
            }
        }
    }

    pub fn input(&self, name: &str) -> Option<&RemoteInput> {
        self.inputs.get(name)
    }

    pub fn feed(&self, name: &str) -> Option<&RemoteFeed> {
        self.feeds.iter().find(|f| f.name == name)
    }

    /// The listed input named `name` under `node`.
    pub fn listed_input(&self, name: &str, node: &str) -> Option<&RemoteInput> {
        self.input_list
            .iter()
            .find(|i| i.name == name && i.belongs_to(node))
    }

    pub fn record_input(&mut self, input: RemoteInput) {
        self.inputs.insert(input.name.clone(), input);
    }

    pub fn record_feed(&mut self, feed: RemoteFeed) {
        self.feeds.push(feed);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn map_then_list_links_ids() {
        let mut snap = RemoteSnapshot::default();
        snap.absorb_inputs(
            Payload::Json(json!({"p1": {"processList": "1:2"}, "p2": {"processList": ""}})),
            "emontx",
        )
        .unwrap();
        snap.absorb_inputs(
            Payload::Json(json!([
                {"id": "5", "nodeid": "emontx", "name": "p1"},
                {"id": "6", "nodeid": "other", "name": "p2"}
            ])),
            "emontx",
        )
        .unwrap();

        assert_eq!(snap.input("p1").unwrap().id, Some(5));
        assert_eq!(snap.input("p1").unwrap().process_list.as_deref(), Some("1:2"));
        assert_eq!(snap.input("p2").unwrap().id, None);
        assert_eq!(snap.listed_input("p2", "other").unwrap().id, Some(6));
    }

    #[test]
    fn unknown_node_is_empty() {
        let mut snap = RemoteSnapshot::default();
        snap.absorb_inputs(
            Payload::Json(json!({"success": false, "message": "Node does not exist"})),
            "n",
        )
        .unwrap();
        assert!(snap.inputs.is_empty());
    }

    #[test]
    fn text_response_is_decode_error() {
        let mut snap = RemoteSnapshot::default();
        let err = snap
            .absorb_inputs(Payload::Text("Invalid API key".into()), "n")
            .unwrap_err();
        assert!(matches!(err, CoreError::Decode { ref message } if message.contains("Invalid API key")));
    }
}
