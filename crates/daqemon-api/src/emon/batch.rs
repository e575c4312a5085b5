// Best-effort sequential batch creation
//
// Creates are awaited one at a time: the server has no bulk endpoint and
// the order of returned ids must follow the input order.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::client::ResourceClient;
use crate::transport::Payload;

/// Normalized outcome of one create call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateOutcome {
    pub success: bool,
    /// Id assigned by the server (`feedid`, or `id` for other families).
    pub id: Option<i64>,
    pub message: Option<String>,
}

impl CreateOutcome {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            id: None,
            message: Some(message.into()),
        }
    }

    /// Fold a create response into an outcome. Anything that is not a JSON
    /// object becomes a failure carrying the text.
    pub fn from_payload(payload: Payload) -> Self {
        let object = match payload {
            Payload::Json(Value::Object(map)) => map,
            other => return Self::failure(other.into_text()),
        };
        let id = ["feedid", "id"]
            .iter()
            .find_map(|k| object.get(*k).and_then(value_as_id));
        Self {
            success: object.get("success").and_then(Value::as_bool).unwrap_or(false),
            id,
            message: object
                .get("message")
                .and_then(Value::as_str)
                .map(String::from),
        }
    }
}

/// Accepts ids sent as numbers or numeric strings.
pub fn value_as_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Progress notification from [`ResourceClient::create_all`].
#[derive(Debug)]
pub enum BatchEvent<'a, T> {
    /// One entity has been attempted.
    Item {
        index: usize,
        entity: &'a T,
        outcome: &'a CreateOutcome,
    },
    /// Every entity has been attempted.
    End,
}

impl ResourceClient {
    /// Create every entity in order, awaiting each before the next.
    ///
    /// A failed item never stops the sequence; transport errors are folded
    /// into failure outcomes. `on_event` sees every item before the next
    /// create is issued, then a final [`BatchEvent::End`].
    pub async fn create_all<T: Serialize>(
        &self,
        entities: &[T],
        mut on_event: impl FnMut(BatchEvent<'_, T>),
    ) -> Vec<CreateOutcome> {
        let mut outcomes = Vec::with_capacity(entities.len());
        for (index, entity) in entities.iter().enumerate() {
            let outcome = match serde_json::to_value(entity) {
                Ok(instance) => match self.create(&instance).await {
                    Ok(payload) => CreateOutcome::from_payload(payload),
                    Err(e) => CreateOutcome::failure(e.to_string()),
                },
                Err(e) => CreateOutcome::failure(format!("cannot serialize entity: {e}")),
            };
            if outcome.success {
                debug!(index, id = ?outcome.id, "created");
            } else {
                warn!(index, message = ?outcome.message, "create failed");
            }
            on_event(BatchEvent::Item {
                index,
                entity,
                outcome: &outcome,
            });
            outcomes.push(outcome);
        }
        on_event(BatchEvent::End);
        outcomes
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn object_response_reads_feedid() {
        let outcome = CreateOutcome::from_payload(Payload::Json(json!({"success": true, "feedid": 12})));
        assert_eq!(
            outcome,
            CreateOutcome {
                success: true,
                id: Some(12),
                message: None
            }
        );
    }

    #[test]
    fn non_object_response_is_a_failure() {
        let outcome = CreateOutcome::from_payload(Payload::Text("Invalid engine".into()));
        assert!(!outcome.success);
        assert_eq!(outcome.message.as_deref(), Some("Invalid engine"));

        let outcome = CreateOutcome::from_payload(Payload::Json(json!(false)));
        assert_eq!(outcome.message.as_deref(), Some("false"));
    }

    #[test]
    fn failure_object_keeps_message() {
        let outcome = CreateOutcome::from_payload(Payload::Json(
            json!({"success": false, "message": "feed already exists"}),
        ));
        assert!(!outcome.success);
        assert_eq!(outcome.message.as_deref(), Some("feed already exists"));
    }
}
