//! The pending request specification ("the dials").
//!
//! Dial-turn actions edit a `PendingSpec` one setting at a time across
//! several steps. Nothing a dial-turn does resets it; only `reset()` after an
//! execution (successful or not) restores the defaults.

use rlfuzz_contracts::{
    dial::{FieldFocus, HttpVerb, Intensity, MutationStrategy, Resource},
    execution::{BodyRequest, ExecutedSpec},
};

/// The request being assembled for the next execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSpec {
    verb: HttpVerb,
    resource: Resource,
    field: FieldFocus,
    strategy: MutationStrategy,
    intensity: Intensity,
}

impl Default for PendingSpec {
    /// No verb (not ready), no resource (primary), all fields, valid, mild.
    fn default() -> Self {
        Self {
            verb: HttpVerb::Unset,
            resource: Resource::Unset,
            field: FieldFocus::All,
            strategy: MutationStrategy::Valid,
            intensity: Intensity::Mild,
        }
    }
}

impl PendingSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Ready ⇔ a verb has been chosen.
    pub fn is_ready(&self) -> bool {
        self.verb != HttpVerb::Unset
    }

    // ── Raw settings ─────────────────────────────────────────────────────────

    pub fn verb(&self) -> HttpVerb {
        self.verb
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn field(&self) -> FieldFocus {
        self.field
    }

    pub fn strategy(&self) -> MutationStrategy {
        self.strategy
    }

    pub fn intensity(&self) -> Intensity {
        self.intensity
    }

    // ── Effective settings (Unset resolved) ──────────────────────────────────

    pub fn effective_resource(&self) -> Resource {
        self.resource.effective()
    }

    pub fn effective_field(&self) -> FieldFocus {
        self.field.effective()
    }

    pub fn effective_strategy(&self) -> MutationStrategy {
        self.strategy.effective()
    }

    pub fn effective_intensity(&self) -> Intensity {
        self.intensity.effective()
    }

    // ── Dial-turns ───────────────────────────────────────────────────────────

    pub fn set_verb(&mut self, verb: HttpVerb) {
        self.verb = verb;
    }

    pub fn set_resource(&mut self, resource: Resource) {
        self.resource = resource;
    }

    pub fn set_field(&mut self, field: FieldFocus) {
        self.field = field;
    }

    pub fn set_strategy(&mut self, strategy: MutationStrategy) {
        self.strategy = strategy;
    }

    pub fn set_intensity(&mut self, intensity: Intensity) {
        self.intensity = intensity;
    }

    /// Snapshot of the effective settings, or `None` while no verb is set.
    pub fn resolve(&self) -> Option<ExecutedSpec> {
        if !self.is_ready() {
            return None;
        }
        Some(ExecutedSpec {
            verb: self.verb,
            resource: self.effective_resource(),
            field: self.effective_field(),
            strategy: self.effective_strategy(),
            intensity: self.effective_intensity(),
        })
    }
}

/// Build the payload request for an executed spec.
pub fn body_request(spec: &ExecutedSpec, parent_id: Option<i64>) -> BodyRequest {
    BodyRequest {
        resource: spec.resource,
        field: spec.field,
        strategy: spec.strategy,
        intensity: spec.intensity,
        parent_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_not_ready() {
        let spec = PendingSpec::new();
        assert!(!spec.is_ready());
        assert_eq!(spec.resolve(), None);
        assert_eq!(spec.effective_field(), FieldFocus::All);
        assert_eq!(spec.effective_strategy(), MutationStrategy::Valid);
        assert_eq!(spec.effective_intensity(), Intensity::Mild);
        assert_eq!(spec.effective_resource(), Resource::Items);
    }

    #[test]
    fn setting_a_verb_makes_it_ready() {
        let mut spec = PendingSpec::new();
        spec.set_verb(HttpVerb::Post);
        assert!(spec.is_ready());
    }

    #[test]
    fn dial_turns_accumulate_until_reset() {
        let mut spec = PendingSpec::new();
        spec.set_field(FieldFocus::Quantity);
        spec.set_strategy(MutationStrategy::Negative);
        spec.set_verb(HttpVerb::Post);
        spec.set_intensity(Intensity::Aggressive);
        // A later dial-turn must not clear the earlier ones.
        spec.set_resource(Resource::Prices);

        let resolved = spec.resolve().unwrap();
        assert_eq!(resolved.verb, HttpVerb::Post);
        assert_eq!(resolved.resource, Resource::Prices);
        assert_eq!(resolved.field, FieldFocus::Quantity);
        assert_eq!(resolved.strategy, MutationStrategy::Negative);
        assert_eq!(resolved.intensity, Intensity::Aggressive);

        spec.reset();
        assert_eq!(spec, PendingSpec::default());
    }

    #[test]
    fn unset_dials_resolve_to_fallbacks() {
        let mut spec = PendingSpec::new();
        spec.set_verb(HttpVerb::List);
        spec.set_field(FieldFocus::Unset);
        spec.set_strategy(MutationStrategy::Unset);
        spec.set_intensity(Intensity::Unset);

        let resolved = spec.resolve().unwrap();
        assert_eq!(resolved.resource, Resource::Items);
        assert_eq!(resolved.field, FieldFocus::All);
        assert_eq!(resolved.strategy, MutationStrategy::Valid);
        assert_eq!(resolved.intensity, Intensity::Mild);
    }
}
