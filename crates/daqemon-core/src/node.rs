// ── Node registration and profile loading ──
//
// Before any reconciliation the node must exist on the server as a device
// resource, and its profile meta (engine and step methods) must be stored
// in the client section.

use daqemon_api::emon::value_as_id;
use daqemon_api::{EmonApi, Payload};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::{ClientSection, Profile, ProfileMeta};

/// What [`register_node`] did to the client section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// The server created the node and assigned this device id.
    Created(i64),
    /// The known device id was updated in place.
    Updated(i64),
    /// Creation was refused but a node with our name exists; its id was
    /// adopted.
    Adopted(i64),
    /// The server rejected an update of a stale device id, which has been
    /// cleared.
    Cleared { message: Option<String> },
}

impl Registration {
    pub fn device_id(&self) -> Option<i64> {
        match self {
            Self::Created(id) | Self::Updated(id) | Self::Adopted(id) => Some(*id),
            Self::Cleared { .. } => None,
        }
    }
}

fn failure_message(object: &serde_json::Map<String, Value>) -> Option<String> {
    object.get("message").and_then(Value::as_str).map(String::from)
}

/// Register the node described by `client`, updating its device id.
///
/// With a known device id the node resource is `set`, otherwise it is
/// `create`d. A numeric answer is the node's id. A refused update clears a
/// stale id; a refused create looks the node up by name.
pub async fn register_node(api: &EmonApi, client: &mut ClientSection) -> Result<Registration, CoreError> {
    let fields = serde_json::to_value(&*client)?;
    let payload = match client.deviceid {
        Some(id) => api.node.set(id, &fields).await?,
        None => api.node.create(&fields).await?,
    };
    let value = match payload {
        Payload::Json(value) => value,
        Payload::Text(text) => Value::String(text.trim().to_owned()),
    };

    if let Some(id) = value_as_id(&value).filter(|id| *id != 0) {
        let updated = client.deviceid.is_some();
        client.deviceid = Some(id);
        if updated {
            debug!(device_id = id, "node updated");
            return Ok(Registration::Updated(id));
        }
        info!(device_id = id, "node created");
        return Ok(Registration::Created(id));
    }

    let Value::Object(object) = value else {
        return Err(CoreError::NodeRegistration {
            message: value.to_string(),
        });
    };
    let success = object.get("success").and_then(Value::as_bool).unwrap_or(false);

    match client.deviceid {
        Some(id) if success => {
            debug!(device_id = id, "node updated");
            Ok(Registration::Updated(id))
        }
        Some(id) => {
            let message = failure_message(&object);
            warn!(device_id = id, ?message, "stale device id cleared");
            client.deviceid = None;
            Ok(Registration::Cleared { message })
        }
        None => {
            let nodes: Vec<Value> = match api.node.list().await? {
                Payload::Json(Value::Array(nodes)) => nodes,
                other => {
                    return Err(CoreError::Decode {
                        message: format!("nodes: {}", other.into_text()),
                    });
                }
            };
            let adopted = nodes
                .iter()
                .find(|n| node_name(n).as_deref() == Some(client.nodeid.as_str()))
                .and_then(|n| n.get("id").and_then(value_as_id));
            match adopted {
                Some(id) => {
                    info!(device_id = id, "adopted existing node");
                    client.deviceid = Some(id);
                    Ok(Registration::Adopted(id))
                }
                None => Err(CoreError::NodeRegistration {
                    message: failure_message(&object).unwrap_or_else(|| "node not created".into()),
                }),
            }
        }
    }
}

fn node_name(node: &Value) -> Option<String> {
    match node.get("nodeid")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Fetch the profile document for `kind` and store its meta in `meta`.
///
/// A document without meta resets `meta` and yields the built-in profile.
pub async fn load_profile(api: &EmonApi, kind: &str, meta: &mut ProfileMeta) -> Result<Profile, CoreError> {
    let document = api.profiles.get(kind).await?.into_json()?;
    meta.adopt(&document);
    debug!(kind, engine = ?meta.engine, "profile loaded");
    Ok(Profile::from_meta(meta))
}

/// The metering server's version string.
pub async fn server_version(api: &EmonApi) -> Result<String, CoreError> {
    Ok(api.version().await?)
}
