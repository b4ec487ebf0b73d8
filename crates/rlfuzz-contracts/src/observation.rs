//! The observation record the agent sees each step.

use serde::{Deserialize, Serialize};

use crate::dial::{FieldFocus, HttpVerb, Intensity, MutationStrategy, Resource};

/// Version of the feature layout produced from an `Observation`.
///
/// Co-versioned with `FEATURE_COUNT` and the value network input dimension.
pub const FEATURE_SCHEMA_VERSION: u32 = 1;

/// Length of the encoded feature vector.
pub const FEATURE_COUNT: usize = 14;

/// Default ceiling for `steps_since_execute`.
pub const STEP_COUNTER_CAP: u32 = 10;

/// Everything the agent knows about the world at the start of a step.
///
/// The dial fields mirror the pending request so the encoder can see what
/// has been configured so far.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Observation {
    /// One flag per tracked resource (indexed by `Resource::slot`): a usable
    /// identifier of that resource is currently held.
    pub id_ready: [bool; Resource::TRACKED],
    /// At least one primary-resource record is known to exist.
    pub primary_exists: bool,
    /// Last observed HTTP status, 0 before any response.
    pub last_status: u16,
    /// Verb of the last executed request, `Unset` before any execution.
    pub last_verb: HttpVerb,
    pub verb: HttpVerb,
    pub resource: Resource,
    pub field: FieldFocus,
    pub strategy: MutationStrategy,
    pub intensity: Intensity,
    /// Dial-turns since the last execute, saturating at the configured cap.
    pub steps_since_execute: u32,
    /// The pending request has a verb and may be executed.
    pub ready: bool,
}

impl Observation {
    /// Readiness flag for `resource` (`Unset` reads the primary slot).
    pub fn has_identifier(&self, resource: Resource) -> bool {
        self.id_ready[resource.slot()]
    }

    pub fn set_identifier_ready(&mut self, resource: Resource, ready: bool) {
        self.id_ready[resource.slot()] = ready;
    }
}
