//! Request, response, and transition records.
//!
//! `ApiRequest`/`ApiResponse` are what cross the boundary to the service
//! under test. `Transition` is what the trainer publishes to subscribers,
//! one per step; `EpisodeSummary` one per episode.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dial::{FieldFocus, HttpMethod, HttpVerb, Intensity, MutationStrategy, Resource};

/// Unique identifier for one training run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub uuid::Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A fully resolved request specification, captured at execute time.
///
/// All fields hold effective values (no `Unset` except when the verb itself
/// was never chosen, which the trainer never executes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutedSpec {
    pub verb: HttpVerb,
    pub resource: Resource,
    pub field: FieldFocus,
    pub strategy: MutationStrategy,
    pub intensity: Intensity,
}

impl fmt::Display for ExecutedSpec {
    /// Compact combination key, e.g. `POST items quantity/negative/mild`.
    /// Used as the novelty key for defect bookkeeping.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}/{}/{}",
            self.verb, self.resource, self.field, self.strategy, self.intensity
        )
    }
}

/// What the payload generator is asked for at execute time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyRequest {
    pub resource: Resource,
    pub field: FieldFocus,
    pub strategy: MutationStrategy,
    pub intensity: Intensity,
    /// Identifier of the parent resource, when one is held.
    pub parent_id: Option<i64>,
}

/// A request ready for the wire. `path` is relative to the service base,
/// e.g. `/items` or `/items/7`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<String>,
}

/// The subset of an HTTP response the engine consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status == 500
    }
}

/// One step of one episode, as published to `TransitionSink`s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    pub episode: u64,
    pub step: u32,
    /// Encoded state the action was chosen in.
    pub features: Vec<f64>,
    pub action: usize,
    pub reward: f64,
    /// The on-policy action chosen for the next state.
    pub next_action: usize,
    pub terminal: bool,
    /// Set only on execute steps.
    pub executed: Option<ExecutedSpec>,
    /// Status of the execute step's response; `None` on dial-turns and
    /// failed executions.
    pub status: Option<u16>,
    pub td_error: f64,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate outcome of one episode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub episode: u64,
    pub total_reward: f64,
    /// Steps whose response was an HTTP 500.
    pub defects: u32,
    pub executes: u32,
    pub dial_turns: u32,
    /// Execute steps that produced no response.
    pub failed_executes: u32,
}
