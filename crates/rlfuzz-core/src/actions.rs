//! Action application and legality masks.

use rlfuzz_contracts::{
    action::{Action, ACTION_COUNT, ACTION_TABLE},
    error::FuzzResult,
    observation::Observation,
};

use crate::dials::PendingSpec;

/// Apply the action at `index` to the pending spec and mirror the dials
/// into `obs`.
///
/// `Execute` is a no-op here; firing the request belongs to the trainer.
/// Returns the decoded action so callers do not decode twice.
pub fn apply_action(
    index: usize,
    pending: &mut PendingSpec,
    obs: &mut Observation,
) -> FuzzResult<Action> {
    let action = Action::from_index(index)?;
    match action {
        Action::SelectVerb(v) => pending.set_verb(v),
        Action::SelectResource(r) => pending.set_resource(r),
        Action::FocusField(f) => pending.set_field(f),
        Action::SelectStrategy(s) => pending.set_strategy(s),
        Action::SelectIntensity(i) => pending.set_intensity(i),
        Action::Execute => return Ok(action),
    }
    mirror_dials(pending, obs);
    Ok(action)
}

/// Copy the raw dial settings and readiness into the observation.
pub fn mirror_dials(pending: &PendingSpec, obs: &mut Observation) {
    obs.verb = pending.verb();
    obs.resource = pending.resource();
    obs.field = pending.field();
    obs.strategy = pending.strategy();
    obs.intensity = pending.intensity();
    obs.ready = pending.is_ready();
}

/// Which actions are legal in `obs` given `pending`.
///
/// Identifier-requiring actions check the flag of the pending spec's
/// effective resource. `Execute` needs a ready spec. Everything else is
/// always legal, so the mask is never all-false.
pub fn compute_mask(obs: &Observation, pending: &PendingSpec) -> [bool; ACTION_COUNT] {
    let target = pending.effective_resource();
    let mut mask = [true; ACTION_COUNT];
    for (slot, action) in mask.iter_mut().zip(ACTION_TABLE.iter()) {
        *slot = if action.requires_identifier() {
            obs.has_identifier(target)
        } else if action.is_execute() {
            pending.is_ready()
        } else {
            true
        };
    }
    mask
}
