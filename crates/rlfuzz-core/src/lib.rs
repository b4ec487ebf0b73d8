//! # rlfuzz-core
//!
//! The learning-and-control engine of rlfuzz.
//!
//! This crate provides:
//! - The trait seams (`ValueFunction`, `ServiceUnderTest`, `PayloadGenerator`,
//!   `Oracle`, `TransitionSink`)
//! - The dial state machine, action masking, and the state encoder
//! - The `Trainer` that runs episodic on-policy SARSA over them
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rlfuzz_core::{Trainer, traits::{ValueFunction, ServiceUnderTest}};
//! ```

pub mod actions;
pub mod dials;
pub mod encoder;
pub mod identifiers;
pub mod selection;
pub mod trainer;
pub mod traits;

pub use trainer::{EpisodeCursor, StepOutcome, Trainer, TrainingReport};

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use rlfuzz_contracts::{
        action::{Action, ACTION_COUNT, EXECUTE_INDEX},
        config::TrainingConfig,
        dial::{HttpMethod, HttpVerb, Resource},
        error::{EnvironmentError, FuzzError, FuzzResult},
        execution::{ApiRequest, ApiResponse, BodyRequest, EpisodeSummary, ExecutedSpec, Transition},
        observation::FEATURE_COUNT,
    };

    use super::*;
    use crate::{
        encoder::encode,
        traits::{Oracle, PayloadGenerator, ServiceUnderTest, TransitionSink, ValueFunction},
    };

    // ── Mock implementations ─────────────────────────────────────────────────

    /// Scores everything 0 and records every update it receives.
    struct FlatValue {
        dims: (usize, usize),
        updates: Arc<Mutex<Vec<(usize, f64)>>>,
    }

    impl FlatValue {
        fn new() -> (Self, Arc<Mutex<Vec<(usize, f64)>>>) {
            let updates = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    dims: (FEATURE_COUNT, ACTION_COUNT),
                    updates: Arc::clone(&updates),
                },
                updates,
            )
        }
    }

    impl ValueFunction for FlatValue {
        fn input_dim(&self) -> usize {
            self.dims.0
        }
        fn action_count(&self) -> usize {
            self.dims.1
        }
        fn estimate(&self, _state: &[f64], _action: usize) -> FuzzResult<f64> {
            Ok(0.0)
        }
        fn estimate_all(&self, _state: &[f64]) -> FuzzResult<Vec<f64>> {
            Ok(vec![0.0; self.dims.1])
        }
        fn update(&mut self, _state: &[f64], action: usize, error: f64, _lr: f64) -> FuzzResult<()> {
            self.updates.lock().unwrap().push((action, error));
            Ok(())
        }
    }

    /// Deterministic CRUD stub: POST → 201 {"id": 7}, DELETE → 204,
    /// list → 200 [], anything else → 200. Records every request.
    #[derive(Clone, Default)]
    struct StubService {
        requests: Arc<Mutex<Vec<ApiRequest>>>,
        fail_all: bool,
        /// Overrides the POST response body.
        create_body: Option<&'static str>,
    }

    impl ServiceUnderTest for StubService {
        fn send(&mut self, request: &ApiRequest) -> Result<ApiResponse, EnvironmentError> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail_all {
                return Err(EnvironmentError::Transport {
                    reason: "connection refused".to_string(),
                });
            }
            let is_collection = request.path.matches('/').count() == 1;
            Ok(match request.method {
                HttpMethod::Post => ApiResponse::new(201, self.create_body.unwrap_or(r#"{"id": 7}"#)),
                HttpMethod::Delete => ApiResponse::new(204, ""),
                HttpMethod::Get if is_collection => ApiResponse::new(200, "[]"),
                _ => ApiResponse::new(200, "{}"),
            })
        }
    }

    struct EchoPayloads;

    impl PayloadGenerator for EchoPayloads {
        fn generate_body(&mut self, request: &BodyRequest) -> String {
            format!(r#"{{"resource":"{}"}}"#, request.resource)
        }
    }

    struct StatusOracle;

    impl Oracle for StatusOracle {
        fn reward(&mut self, response: Option<&ApiResponse>, _executed: Option<&ExecutedSpec>) -> f64 {
            match response {
                None => -0.15,
                Some(r) if r.status == 500 => 10.0,
                Some(_) => 0.0,
            }
        }
    }

    #[derive(Default)]
    struct SinkLog {
        transitions: Vec<Transition>,
        episodes: Vec<EpisodeSummary>,
        finalized: Vec<String>,
    }

    struct RecordingSink(Arc<Mutex<SinkLog>>);

    impl TransitionSink for RecordingSink {
        fn record(&mut self, transition: &Transition) -> FuzzResult<()> {
            self.0.lock().unwrap().transitions.push(transition.clone());
            Ok(())
        }
        fn episode_finished(&mut self, summary: &EpisodeSummary) -> FuzzResult<()> {
            self.0.lock().unwrap().episodes.push(summary.clone());
            Ok(())
        }
        fn finalize(&mut self, run_id: &str) -> FuzzResult<()> {
            self.0.lock().unwrap().finalized.push(run_id.to_string());
            Ok(())
        }
    }

    struct FailingSink;

    impl TransitionSink for FailingSink {
        fn record(&mut self, _transition: &Transition) -> FuzzResult<()> {
            Err(FuzzError::JournalWriteFailed {
                reason: "disk full".to_string(),
            })
        }
    }

    fn config(episodes: u64, step_limit: u32) -> TrainingConfig {
        TrainingConfig {
            episodes,
            step_limit,
            epsilon: 0.0,
            log_every: 1,
            ..TrainingConfig::default()
        }
    }

    fn trainer_with(service: StubService, cfg: TrainingConfig) -> Trainer {
        let (value, _) = FlatValue::new();
        Trainer::new(
            cfg,
            Box::new(value),
            Box::new(service),
            Box::new(EchoPayloads),
            Box::new(StatusOracle),
        )
        .unwrap()
    }

    fn idx(action: Action) -> usize {
        action.index().unwrap()
    }

    // ── Construction ─────────────────────────────────────────────────────────

    #[test]
    fn rejects_value_function_with_wrong_input_dim() {
        let (mut value, _) = FlatValue::new();
        value.dims.0 = 3;
        let result = Trainer::new(
            config(1, 5),
            Box::new(value),
            Box::new(StubService::default()),
            Box::new(EchoPayloads),
            Box::new(StatusOracle),
        );
        assert!(matches!(
            result,
            Err(FuzzError::DimensionMismatch { expected: FEATURE_COUNT, actual: 3 })
        ));
    }

    #[test]
    fn rejects_invalid_config() {
        let (value, _) = FlatValue::new();
        let result = Trainer::new(
            config(1, 0),
            Box::new(value),
            Box::new(StubService::default()),
            Box::new(EchoPayloads),
            Box::new(StatusOracle),
        );
        assert!(matches!(result, Err(FuzzError::ConfigError { .. })));
    }

    // ── Identifier lifecycle ─────────────────────────────────────────────────

    #[test]
    fn post_then_get_keeps_identifier_ready() {
        let service = StubService::default();
        let requests = Arc::clone(&service.requests);
        let mut trainer = trainer_with(service, config(1, 10));
        let mut cursor = trainer.begin_episode(0).unwrap();
        assert!(!cursor.observation.has_identifier(Resource::Items));

        trainer
            .advance(&mut cursor, idx(Action::SelectVerb(HttpVerb::Post)))
            .unwrap();
        let outcome = trainer.advance(&mut cursor, EXECUTE_INDEX).unwrap();
        assert_eq!(outcome.response.unwrap().status, 201);
        assert!(cursor.observation.has_identifier(Resource::Items));
        assert_eq!(trainer.identifiers().get(Resource::Items), Some(7));

        trainer
            .advance(&mut cursor, idx(Action::SelectVerb(HttpVerb::Get)))
            .unwrap();
        let outcome = trainer.advance(&mut cursor, EXECUTE_INDEX).unwrap();
        assert_eq!(outcome.response.unwrap().status, 200);
        assert!(cursor.observation.has_identifier(Resource::Items));

        let sent = requests.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].method, HttpMethod::Post);
        assert_eq!(sent[0].path, "/items");
        assert!(sent[0].body.is_some());
        assert_eq!(sent[1].method, HttpMethod::Get);
        assert_eq!(sent[1].path, "/items/7");
        assert!(sent[1].body.is_none());
    }

    #[test]
    fn delete_clears_identifier_and_masks_dependent_verbs() {
        let mut trainer = trainer_with(StubService::default(), config(1, 10));
        let mut cursor = trainer.begin_episode(0).unwrap();

        trainer
            .advance(&mut cursor, idx(Action::SelectVerb(HttpVerb::Post)))
            .unwrap();
        trainer.advance(&mut cursor, EXECUTE_INDEX).unwrap();
        trainer
            .advance(&mut cursor, idx(Action::SelectVerb(HttpVerb::Delete)))
            .unwrap();
        let outcome = trainer.advance(&mut cursor, EXECUTE_INDEX).unwrap();
        assert_eq!(outcome.response.unwrap().status, 204);

        assert!(!cursor.observation.has_identifier(Resource::Items));
        assert_eq!(trainer.identifiers().get(Resource::Items), None);

        let err = trainer
            .advance(&mut cursor, idx(Action::SelectVerb(HttpVerb::Get)))
            .unwrap_err();
        assert!(matches!(err, FuzzError::InvalidArgument { .. }));
    }

    #[test]
    fn identifiers_persist_into_the_next_episode() {
        let mut trainer = trainer_with(StubService::default(), config(2, 3));
        let mut cursor = trainer.begin_episode(0).unwrap();
        trainer
            .advance(&mut cursor, idx(Action::SelectVerb(HttpVerb::Post)))
            .unwrap();
        trainer.advance(&mut cursor, EXECUTE_INDEX).unwrap();

        let next = trainer.begin_episode(1).unwrap();
        assert!(next.observation.has_identifier(Resource::Items));
        assert!(!next.observation.ready);
    }

    // ── Step semantics ───────────────────────────────────────────────────────

    #[test]
    fn execute_resets_dials_and_step_counter() {
        let mut trainer = trainer_with(StubService::default(), config(1, 10));
        let mut cursor = trainer.begin_episode(0).unwrap();

        trainer
            .advance(&mut cursor, idx(Action::SelectVerb(HttpVerb::List)))
            .unwrap();
        trainer
            .advance(&mut cursor, idx(Action::SelectResource(Resource::Prices)))
            .unwrap();
        assert_eq!(cursor.observation.steps_since_execute, 2);
        assert!(cursor.observation.ready);

        let outcome = trainer.advance(&mut cursor, EXECUTE_INDEX).unwrap();
        assert_eq!(outcome.executed.unwrap().resource, Resource::Prices);
        assert_eq!(cursor.pending, dials::PendingSpec::default());
        assert_eq!(cursor.observation.steps_since_execute, 0);
        assert!(!cursor.observation.ready);
        assert_eq!(cursor.observation.last_verb, HttpVerb::List);
        assert_eq!(cursor.observation.last_status, 200);
    }

    #[test]
    fn dial_turns_score_as_no_response() {
        let mut trainer = trainer_with(StubService::default(), config(1, 10));
        let mut cursor = trainer.begin_episode(0).unwrap();
        let outcome = trainer
            .advance(&mut cursor, idx(Action::SelectVerb(HttpVerb::Post)))
            .unwrap();
        assert!(outcome.executed.is_none());
        assert_eq!(outcome.reward, -0.15);
    }

    #[test]
    fn transport_failure_is_scored_not_raised() {
        let service = StubService {
            fail_all: true,
            ..StubService::default()
        };
        let mut trainer = trainer_with(service, config(1, 10));
        let mut cursor = trainer.begin_episode(0).unwrap();

        trainer
            .advance(&mut cursor, idx(Action::SelectVerb(HttpVerb::Post)))
            .unwrap();
        let outcome = trainer.advance(&mut cursor, EXECUTE_INDEX).unwrap();
        assert!(outcome.response.is_none());
        assert_eq!(outcome.reward, -0.15);
        assert_eq!(cursor.observation.last_status, 0);
        assert_eq!(cursor.observation.last_verb, HttpVerb::Unset);
        assert!(!cursor.observation.has_identifier(Resource::Items));
        assert_eq!(cursor.summary.failed_executes, 1);
    }

    #[test]
    fn non_json_create_is_scored_as_no_response() {
        let service = StubService {
            create_body: Some("<html>not json"),
            ..StubService::default()
        };
        let requests = Arc::clone(&service.requests);
        let mut trainer = trainer_with(service, config(1, 10));
        let mut cursor = trainer.begin_episode(0).unwrap();

        trainer
            .advance(&mut cursor, idx(Action::SelectVerb(HttpVerb::Post)))
            .unwrap();
        let outcome = trainer.advance(&mut cursor, EXECUTE_INDEX).unwrap();

        assert_eq!(requests.lock().unwrap().len(), 1);
        assert!(outcome.response.is_none());
        assert_eq!(outcome.reward, -0.15);
        assert_eq!(cursor.observation.last_status, 0);
        assert_eq!(cursor.observation.last_verb, HttpVerb::Unset);
        assert!(!cursor.observation.primary_exists);
        assert!(!cursor.observation.has_identifier(Resource::Items));
        assert_eq!(trainer.identifiers().get(Resource::Items), None);
    }

    #[test]
    fn identifier_verb_on_untracked_resource_sends_nothing() {
        let service = StubService::default();
        let requests = Arc::clone(&service.requests);
        let mut trainer = trainer_with(service, config(1, 10));
        let mut cursor = trainer.begin_episode(0).unwrap();

        trainer
            .advance(&mut cursor, idx(Action::SelectVerb(HttpVerb::Post)))
            .unwrap();
        trainer.advance(&mut cursor, EXECUTE_INDEX).unwrap();
        // GET is legal while items is targeted, then the target moves.
        trainer
            .advance(&mut cursor, idx(Action::SelectVerb(HttpVerb::Get)))
            .unwrap();
        trainer
            .advance(&mut cursor, idx(Action::SelectResource(Resource::Points)))
            .unwrap();
        let outcome = trainer.advance(&mut cursor, EXECUTE_INDEX).unwrap();

        assert!(outcome.response.is_none());
        assert_eq!(outcome.reward, -0.15);
        assert_eq!(requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn masked_scripted_action_is_rejected() {
        let mut trainer = trainer_with(StubService::default(), config(1, 10));
        let mut cursor = trainer.begin_episode(0).unwrap();
        assert!(matches!(
            trainer.advance(&mut cursor, EXECUTE_INDEX),
            Err(FuzzError::InvalidArgument { .. })
        ));
        assert!(matches!(
            trainer.advance(&mut cursor, ACTION_COUNT),
            Err(FuzzError::ActionOutOfRange { .. })
        ));
    }

    #[test]
    fn terminal_step_uses_reward_alone() {
        let (value, updates) = FlatValue::new();
        let mut trainer = Trainer::new(
            config(1, 2),
            Box::new(value),
            Box::new(StubService::default()),
            Box::new(EchoPayloads),
            Box::new(StatusOracle),
        )
        .unwrap();
        let mut cursor = trainer.begin_episode(0).unwrap();
        trainer
            .advance(&mut cursor, idx(Action::SelectVerb(HttpVerb::Post)))
            .unwrap();
        let last = trainer.advance(&mut cursor, EXECUTE_INDEX).unwrap();

        assert!(last.terminal);
        assert!(cursor.is_finished());
        assert_eq!(last.td_error, 0.0);
        let updates = updates.lock().unwrap();
        assert_eq!(updates.as_slice(), &[(2, -0.15), (EXECUTE_INDEX, 0.0)]);

        assert!(trainer.advance(&mut cursor, 0).is_err());
    }

    #[test]
    fn transition_carries_pre_action_features() {
        let log = Arc::new(Mutex::new(SinkLog::default()));
        let mut trainer = trainer_with(StubService::default(), config(1, 4))
            .with_sink(Box::new(RecordingSink(Arc::clone(&log))));
        let mut cursor = trainer.begin_episode(0).unwrap();
        let expected = encode(&cursor.observation, 10).to_vec();

        trainer
            .advance(&mut cursor, idx(Action::SelectVerb(HttpVerb::Post)))
            .unwrap();
        let log = log.lock().unwrap();
        assert_eq!(log.transitions[0].features, expected);
        assert_eq!(log.transitions[0].action, idx(Action::SelectVerb(HttpVerb::Post)));
    }

    // ── Full runs ────────────────────────────────────────────────────────────

    #[test]
    fn run_publishes_every_step_and_episode() {
        let log = Arc::new(Mutex::new(SinkLog::default()));
        let mut trainer = trainer_with(StubService::default(), config(3, 5))
            .with_sink(Box::new(RecordingSink(Arc::clone(&log))));

        let report = trainer.run().unwrap();
        assert_eq!(report.episodes, 3);
        assert_eq!(report.steps, 15);

        let log = log.lock().unwrap();
        assert_eq!(log.transitions.len(), 15);
        assert_eq!(log.episodes.len(), 3);
        assert_eq!(log.finalized, vec![report.run_id.clone()]);
        let terminals = log.transitions.iter().filter(|t| t.terminal).count();
        assert_eq!(terminals, 3);
        assert!(log.transitions[4].terminal);
        assert_eq!(log.transitions[4].step, 4);
    }

    #[test]
    fn failing_sink_aborts_the_run() {
        let mut trainer =
            trainer_with(StubService::default(), config(1, 5)).with_sink(Box::new(FailingSink));
        assert!(matches!(
            trainer.run(),
            Err(FuzzError::JournalWriteFailed { .. })
        ));
    }

    #[test]
    fn greedy_run_with_flat_values_is_deterministic() {
        let run = || {
            let service = StubService::default();
            let requests = Arc::clone(&service.requests);
            let cfg = TrainingConfig {
                epsilon: 0.3,
                ..config(2, 12)
            };
            trainer_with(service, cfg).run().unwrap();
            let sent = requests.lock().unwrap().clone();
            sent
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn window_length_does_not_change_the_run() {
        let run = |log_every: u64| {
            let service = StubService::default();
            let requests = Arc::clone(&service.requests);
            let cfg = TrainingConfig {
                epsilon: 0.3,
                log_every,
                ..config(4, 12)
            };
            let report = trainer_with(service, cfg).run().unwrap();
            let sent = requests.lock().unwrap().clone();
            (sent, report.executes, report.defects, report.total_reward)
        };
        assert_eq!(run(1), run(1_000));
    }
}
