//! Server-assigned identifier bookkeeping.
//!
//! Identifiers are only ever learned from responses: a successful create,
//! or the first entry of a successful list while none is held. A successful
//! delete forgets the identifier. Nothing here guesses.

use rlfuzz_contracts::{
    dial::{HttpVerb, Resource},
    error::EnvironmentError,
    execution::{ApiResponse, ExecutedSpec},
    observation::Observation,
};
use serde_json::Value;
use tracing::debug;

/// One remembered identifier per tracked resource, indexed by `Resource::slot`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierBook {
    ids: [Option<i64>; Resource::TRACKED],
    primary_exists: bool,
}

impl IdentifierBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, resource: Resource) -> Option<i64> {
        self.ids[resource.slot()]
    }

    pub fn primary_exists(&self) -> bool {
        self.primary_exists
    }

    /// Identifier of `resource`'s parent, if it has one and it is held.
    pub fn parent_of(&self, resource: Resource) -> Option<i64> {
        resource.parent().and_then(|p| self.get(p))
    }

    /// Update the book from the response to an executed request.
    ///
    /// A create or list whose body is not JSON is a `MalformedResponse` and
    /// leaves the book untouched.
    pub fn absorb(&mut self, spec: &ExecutedSpec, response: &ApiResponse) -> Result<(), EnvironmentError> {
        let resource = spec.resource.effective();
        let slot = resource.slot();
        match (spec.verb, response.status) {
            (HttpVerb::Post, 201) => {
                if let Some(id) = extract_id(&response.body)? {
                    debug!(%resource, id, "identifier learned from create");
                    self.ids[slot] = Some(id);
                }
                if resource == Resource::PRIMARY {
                    self.primary_exists = true;
                }
            }
            (HttpVerb::Delete, 200 | 204) => {
                if self.ids[slot].take().is_some() {
                    debug!(%resource, "identifier forgotten after delete");
                }
            }
            (HttpVerb::List, 200) => {
                let entries = parse_list(&response.body)?;
                let first = entries.first().and_then(id_of);
                if resource == Resource::PRIMARY {
                    self.primary_exists = !entries.is_empty();
                }
                if self.ids[slot].is_none() {
                    if let Some(id) = first {
                        debug!(%resource, id, "identifier learned from list");
                        self.ids[slot] = Some(id);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Write readiness flags and the primary-exists flag into `obs`.
    pub fn project(&self, obs: &mut Observation) {
        for (flag, id) in obs.id_ready.iter_mut().zip(self.ids.iter()) {
            *flag = id.is_some();
        }
        obs.primary_exists = self.primary_exists;
    }
}

fn parse(body: &str) -> Result<Value, EnvironmentError> {
    serde_json::from_str(body).map_err(|e| EnvironmentError::MalformedResponse {
        reason: format!("body is not JSON: {}", e),
    })
}

/// The top-level `id` of a JSON object body. Accepts an integer or a
/// numeric string. A JSON body without a usable `id` is `Ok(None)`.
pub fn extract_id(body: &str) -> Result<Option<i64>, EnvironmentError> {
    Ok(id_of(&parse(body)?))
}

/// The `id` of the first element of a JSON array body.
pub fn extract_first_id(body: &str) -> Result<Option<i64>, EnvironmentError> {
    Ok(parse_list(body)?.first().and_then(id_of))
}

/// A list body must be a JSON array.
fn parse_list(body: &str) -> Result<Vec<Value>, EnvironmentError> {
    match parse(body)? {
        Value::Array(entries) => Ok(entries),
        other => Err(EnvironmentError::MalformedResponse {
            reason: format!("expected a JSON array, got {}", json_kind(&other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn id_of(value: &Value) -> Option<i64> {
    match value.get("id")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
