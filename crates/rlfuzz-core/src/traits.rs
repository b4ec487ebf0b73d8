//! Trait seams between the trainer and its collaborators.
//!
//! - `ValueFunction`:    the action-value approximator the policy reads and trains
//! - `ServiceUnderTest`: the HTTP service being fuzzed
//! - `PayloadGenerator`: turns dial settings into a request body
//! - `Oracle`:           scores a step's outcome
//! - `TransitionSink`:   subscribes to the stream of transitions
//!
//! The trainer owns one of each (sinks: any number) and drives them in a
//! fixed order every step. None of them is shared across threads.

use rlfuzz_contracts::{
    error::{EnvironmentError, FuzzResult},
    execution::{ApiRequest, ApiResponse, BodyRequest, EpisodeSummary, ExecutedSpec, Transition},
};

/// A differentiable estimate of Q(s, a) for a fixed action set.
///
/// Dimension and index violations are caller bugs: implementations return
/// `FuzzError::DimensionMismatch` / `FuzzError::ActionOutOfRange` instead of
/// clamping.
pub trait ValueFunction: Send {
    /// Length of the feature vector this function accepts.
    fn input_dim(&self) -> usize;

    /// Number of discrete actions it scores.
    fn action_count(&self) -> usize;

    /// Q(state, action). No side effects.
    fn estimate(&self, state: &[f64], action: usize) -> FuzzResult<f64>;

    /// Q(state, ·) from a single forward pass. Element `a` equals
    /// `estimate(state, a)`.
    fn estimate_all(&self, state: &[f64]) -> FuzzResult<Vec<f64>>;

    /// argmax over `estimate_all`, ties broken by lowest index.
    fn best_action(&self, state: &[f64]) -> FuzzResult<usize> {
        let values = self.estimate_all(state)?;
        let mut best = 0;
        for (a, v) in values.iter().enumerate().skip(1) {
            if *v > values[best] {
                best = a;
            }
        }
        Ok(best)
    }

    /// One semi-gradient ascent step on `error · Q(state, action)`.
    ///
    /// `error` is clipped by the implementation before use. An `error` of
    /// zero must leave every parameter unchanged.
    fn update(
        &mut self,
        state: &[f64],
        action: usize,
        error: f64,
        learning_rate: f64,
    ) -> FuzzResult<()>;
}

/// The service whose defects the agent is hunting.
///
/// Implementations block until the request completes or fails. Any failure
/// is reported as an `EnvironmentError`; the trainer scores it and moves on.
pub trait ServiceUnderTest: Send {
    fn send(&mut self, request: &ApiRequest) -> Result<ApiResponse, EnvironmentError>;
}

/// Produces a request body for a resolved set of dials.
///
/// Called only at execute time and only for verbs that carry a body.
pub trait PayloadGenerator: Send {
    fn generate_body(&mut self, request: &BodyRequest) -> String;
}

/// Maps the outcome of a step to a scalar reward.
///
/// `response` is `None` for dial-turns and for executions that produced no
/// response. `executed` is `Some` only on execute steps. Novelty tracking is
/// a side channel for reporting and must not change the returned reward.
pub trait Oracle: Send {
    /// Called before `reward` with the position of the step being scored.
    fn begin_step(&mut self, episode: u64, step: u32) {
        let _ = (episode, step);
    }

    fn reward(&mut self, response: Option<&ApiResponse>, executed: Option<&ExecutedSpec>) -> f64;
}

/// A subscriber to the trainer's transition stream.
///
/// Sinks observe; they never influence learning. A failing sink aborts the
/// run with `FuzzError::JournalWriteFailed`, the same way the run would stop
/// if it could no longer be recorded.
pub trait TransitionSink: Send {
    /// Called once per step, after the value update.
    fn record(&mut self, transition: &Transition) -> FuzzResult<()>;

    /// Called once per episode, after its last step.
    fn episode_finished(&mut self, summary: &EpisodeSummary) -> FuzzResult<()> {
        let _ = summary;
        Ok(())
    }

    /// Called once when the run ends.
    fn finalize(&mut self, run_id: &str) -> FuzzResult<()> {
        let _ = run_id;
        Ok(())
    }
}
