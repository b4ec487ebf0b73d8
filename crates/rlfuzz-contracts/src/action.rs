//! The fixed, totally ordered action table.
//!
//! Action indices double as the value network's output heads, so the table
//! below is the single source of truth for what index `i` means. The table
//! is written out literally; `ACTION_SCHEMA_VERSION` must be bumped whenever
//! an entry moves, appears, or disappears.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    dial::{FieldFocus, HttpVerb, Intensity, MutationStrategy, Resource},
    error::{FuzzError, FuzzResult},
};

/// Version of the action table layout below.
pub const ACTION_SCHEMA_VERSION: u32 = 1;

/// Total number of discrete actions.
pub const ACTION_COUNT: usize = 33;

/// Index of the single terminal `Execute` action.
pub const EXECUTE_INDEX: usize = ACTION_COUNT - 1;

/// One discrete choice the agent can make in a step.
///
/// Every variant except `Execute` is a dial-turn: it edits the pending
/// request and never touches the service under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    SelectVerb(HttpVerb),
    SelectResource(Resource),
    FocusField(FieldFocus),
    SelectStrategy(MutationStrategy),
    SelectIntensity(Intensity),
    Execute,
}

/// Index → action. Position in this array is the action's stable index.
pub const ACTION_TABLE: [Action; ACTION_COUNT] = [
    // verb-select (0..=5)
    Action::SelectVerb(HttpVerb::Get),
    Action::SelectVerb(HttpVerb::List),
    Action::SelectVerb(HttpVerb::Post),
    Action::SelectVerb(HttpVerb::Put),
    Action::SelectVerb(HttpVerb::Patch),
    Action::SelectVerb(HttpVerb::Delete),
    // resource-select (6..=9)
    Action::SelectResource(Resource::Items),
    Action::SelectResource(Resource::Prices),
    Action::SelectResource(Resource::Discounts),
    Action::SelectResource(Resource::Points),
    // field-focus (10..=20)
    Action::FocusField(FieldFocus::Name),
    Action::FocusField(FieldFocus::Quantity),
    Action::FocusField(FieldFocus::Description),
    Action::FocusField(FieldFocus::Price),
    Action::FocusField(FieldFocus::ItemRef),
    Action::FocusField(FieldFocus::Discount),
    Action::FocusField(FieldFocus::PriceRef),
    Action::FocusField(FieldFocus::Points),
    Action::FocusField(FieldFocus::DiscountRef),
    Action::FocusField(FieldFocus::All),
    Action::FocusField(FieldFocus::Unknown),
    // strategy-select (21..=28)
    Action::SelectStrategy(MutationStrategy::Valid),
    Action::SelectStrategy(MutationStrategy::NullInject),
    Action::SelectStrategy(MutationStrategy::Negative),
    Action::SelectStrategy(MutationStrategy::Boundary),
    Action::SelectStrategy(MutationStrategy::Structure),
    Action::SelectStrategy(MutationStrategy::Injection),
    Action::SelectStrategy(MutationStrategy::TypeConfuse),
    Action::SelectStrategy(MutationStrategy::Encoding),
    // intensity-select (29..=31)
    Action::SelectIntensity(Intensity::Mild),
    Action::SelectIntensity(Intensity::Moderate),
    Action::SelectIntensity(Intensity::Aggressive),
    // execute (32)
    Action::Execute,
];

impl Action {
    /// Resolve an index into the table, failing fast on out-of-range input.
    pub fn from_index(index: usize) -> FuzzResult<Action> {
        ACTION_TABLE
            .get(index)
            .copied()
            .ok_or(FuzzError::ActionOutOfRange {
                index,
                count: ACTION_COUNT,
            })
    }

    /// The stable index of this action, or `None` for actions that are not
    /// in the table (e.g. selecting `Unset`).
    pub fn index(self) -> Option<usize> {
        ACTION_TABLE.iter().position(|a| *a == self)
    }

    pub fn is_execute(self) -> bool {
        matches!(self, Action::Execute)
    }

    /// True when the action is only legal while an identifier for the
    /// currently targeted resource is held.
    pub fn requires_identifier(self) -> bool {
        match self {
            Action::SelectVerb(verb) => verb.needs_identifier(),
            _ => false,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::SelectVerb(v) => write!(f, "verb:{v}"),
            Action::SelectResource(r) => write!(f, "resource:{r}"),
            Action::FocusField(x) => write!(f, "field:{x}"),
            Action::SelectStrategy(s) => write!(f, "strategy:{s}"),
            Action::SelectIntensity(i) => write!(f, "intensity:{i}"),
            Action::Execute => f.write_str("execute"),
        }
    }
}
