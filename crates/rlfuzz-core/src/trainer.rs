//! The episodic SARSA trainer: the dial-turn-then-execute control loop.
//!
//! Every step runs in this order:
//!
//!   apply dial-turn | execute → next observation → mask → next action
//!     → reward → SARSA update → publish transition
//!
//! The update bootstraps from the action the policy actually chose for the
//! next state, not the max. The last step of an episode is terminal and uses
//! the reward alone.
//!
//! Only caller bugs (`FuzzError`) leave this module. Service failures are
//! scored as "no response" and the loop carries on.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use rlfuzz_contracts::{
    action::{Action, ACTION_COUNT},
    config::TrainingConfig,
    error::{FuzzError, FuzzResult},
    execution::{ApiRequest, ApiResponse, EpisodeSummary, ExecutedSpec, RunId, Transition},
    observation::{Observation, FEATURE_COUNT},
};

use crate::{
    actions::{apply_action, compute_mask, mirror_dials},
    dials::{body_request, PendingSpec},
    encoder::encode,
    identifiers::IdentifierBook,
    selection::EpsilonGreedy,
    traits::{Oracle, PayloadGenerator, ServiceUnderTest, TransitionSink, ValueFunction},
};

/// Position and working state of one in-flight episode.
#[derive(Debug, Clone)]
pub struct EpisodeCursor {
    pub episode: u64,
    /// Index of the next step to run.
    pub step: u32,
    pub observation: Observation,
    pub pending: PendingSpec,
    features: [f64; FEATURE_COUNT],
    /// The action the policy chose for the current state.
    pub action: usize,
    pub summary: EpisodeSummary,
    finished: bool,
}

impl EpisodeCursor {
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn features(&self) -> &[f64] {
        &self.features
    }
}

/// What happened in one step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub action: Action,
    pub executed: Option<ExecutedSpec>,
    pub response: Option<ApiResponse>,
    pub reward: f64,
    pub td_error: f64,
    pub next_action: usize,
    pub terminal: bool,
}

/// Totals for a finished run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingReport {
    pub run_id: String,
    pub episodes: u64,
    pub steps: u64,
    pub total_reward: f64,
    pub executes: u64,
    pub failed_executes: u64,
    pub defects: u64,
}

/// Drives episodes against a service and trains the value function in place.
///
/// Owns every collaborator. One trainer is one run.
pub struct Trainer {
    config: TrainingConfig,
    value: Box<dyn ValueFunction>,
    service: Box<dyn ServiceUnderTest>,
    payloads: Box<dyn PayloadGenerator>,
    oracle: Box<dyn Oracle>,
    sinks: Vec<Box<dyn TransitionSink>>,
    policy: EpsilonGreedy,
    identifiers: IdentifierBook,
    run_id: RunId,
}

impl Trainer {
    /// Validate the configuration and the value function's shape.
    pub fn new(
        config: TrainingConfig,
        value: Box<dyn ValueFunction>,
        service: Box<dyn ServiceUnderTest>,
        payloads: Box<dyn PayloadGenerator>,
        oracle: Box<dyn Oracle>,
    ) -> FuzzResult<Self> {
        config.validate()?;
        if value.input_dim() != FEATURE_COUNT {
            return Err(FuzzError::DimensionMismatch {
                expected: FEATURE_COUNT,
                actual: value.input_dim(),
            });
        }
        if value.action_count() != ACTION_COUNT {
            return Err(FuzzError::InvalidArgument {
                reason: format!(
                    "value function scores {} actions, action table has {}",
                    value.action_count(),
                    ACTION_COUNT
                ),
            });
        }
        let policy = EpsilonGreedy::new(config.epsilon, config.exploration_seed())?;

        Ok(Self {
            config,
            value,
            service,
            payloads,
            oracle,
            sinks: Vec::new(),
            policy,
            identifiers: IdentifierBook::new(),
            run_id: RunId::new(),
        })
    }

    /// Subscribe a sink to the transition stream.
    pub fn with_sink(mut self, sink: Box<dyn TransitionSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn identifiers(&self) -> &IdentifierBook {
        &self.identifiers
    }

    pub fn value_function(&self) -> &dyn ValueFunction {
        self.value.as_ref()
    }

    /// Run every configured episode, then finalize the sinks.
    pub fn run(&mut self) -> FuzzResult<TrainingReport> {
        let run_id = self.run_id.to_string();
        info!(
            run_id = %run_id,
            episodes = self.config.episodes,
            step_limit = self.config.step_limit,
            epsilon = self.config.epsilon,
            "training run starting"
        );

        let mut report = TrainingReport {
            run_id: run_id.clone(),
            ..TrainingReport::default()
        };

        for episode in 0..self.config.episodes {
            let summary = self.run_episode(episode)?;

            report.episodes += 1;
            report.steps += u64::from(self.config.step_limit);
            report.total_reward += summary.total_reward;
            report.executes += u64::from(summary.executes);
            report.failed_executes += u64::from(summary.failed_executes);
            report.defects += u64::from(summary.defects);
        }

        for sink in &mut self.sinks {
            sink.finalize(&run_id)?;
        }

        info!(
            run_id = %run_id,
            episodes = report.episodes,
            defects = report.defects,
            total_reward = report.total_reward,
            "training run complete"
        );
        Ok(report)
    }

    /// Run one episode to its step limit.
    pub fn run_episode(&mut self, episode: u64) -> FuzzResult<EpisodeSummary> {
        let mut cursor = self.begin_episode(episode)?;
        while !cursor.is_finished() {
            let action = cursor.action;
            self.advance(&mut cursor, action)?;
        }
        Ok(cursor.summary)
    }

    /// Reset the dials, build the first observation, choose the first action.
    ///
    /// Identifiers are not forgotten between episodes; the readiness flags
    /// start from whatever is still held.
    pub fn begin_episode(&mut self, episode: u64) -> FuzzResult<EpisodeCursor> {
        let pending = PendingSpec::new();
        let mut observation = Observation::default();
        mirror_dials(&pending, &mut observation);
        self.identifiers.project(&mut observation);

        let features = encode(&observation, self.config.step_counter_cap);
        let mask = compute_mask(&observation, &pending);
        let action = self.policy.select(self.value.as_ref(), &features, &mask)?;

        debug!(episode, first_action = action, "episode starting");

        Ok(EpisodeCursor {
            episode,
            step: 0,
            observation,
            pending,
            features,
            action,
            summary: EpisodeSummary {
                episode,
                ..EpisodeSummary::default()
            },
            finished: false,
        })
    }

    /// Take `action` in the cursor's current state and learn from it.
    ///
    /// `run_episode` always passes the policy's own choice. Other callers may
    /// script the action; it must still be legal in the current state.
    pub fn advance(&mut self, cursor: &mut EpisodeCursor, action: usize) -> FuzzResult<StepOutcome> {
        if cursor.finished {
            return Err(FuzzError::InvalidArgument {
                reason: format!("episode {} already finished", cursor.episode),
            });
        }
        let decoded = Action::from_index(action)?;
        let mask = compute_mask(&cursor.observation, &cursor.pending);
        if !mask[action] {
            return Err(FuzzError::InvalidArgument {
                reason: format!("action {decoded} is masked in the current state"),
            });
        }

        let state = cursor.features;
        let (executed, response) = if decoded.is_execute() {
            self.execute(cursor)
        } else {
            apply_action(action, &mut cursor.pending, &mut cursor.observation)?;
            cursor.observation.steps_since_execute = cursor
                .observation
                .steps_since_execute
                .saturating_add(1)
                .min(self.config.step_counter_cap);
            debug!(episode = cursor.episode, step = cursor.step, action = %decoded, "dial turned");
            (None, None)
        };

        let terminal = cursor.step + 1 >= self.config.step_limit;
        let next_features = encode(&cursor.observation, self.config.step_counter_cap);
        let next_mask = compute_mask(&cursor.observation, &cursor.pending);
        let next_action = self
            .policy
            .select(self.value.as_ref(), &next_features, &next_mask)?;

        self.oracle.begin_step(cursor.episode, cursor.step);
        let reward = self.oracle.reward(response.as_ref(), executed.as_ref());

        let current = self.value.estimate(&state, action)?;
        let bootstrap = if terminal {
            0.0
        } else {
            self.config.discount * self.value.estimate(&next_features, next_action)?
        };
        let td_error = reward + bootstrap - current;
        self.value
            .update(&state, action, td_error, self.config.learning_rate)?;

        let status = response.as_ref().map(|r| r.status);
        let summary = &mut cursor.summary;
        summary.total_reward += reward;
        if decoded.is_execute() {
            summary.executes += 1;
            match status {
                Some(500) => summary.defects += 1,
                None => summary.failed_executes += 1,
                Some(_) => {}
            }
        } else {
            summary.dial_turns += 1;
        }

        let transition = Transition {
            episode: cursor.episode,
            step: cursor.step,
            features: state.to_vec(),
            action,
            reward,
            next_action,
            terminal,
            executed,
            status,
            td_error,
            timestamp: Utc::now(),
        };
        for sink in &mut self.sinks {
            sink.record(&transition)?;
        }

        cursor.features = next_features;
        cursor.action = next_action;
        cursor.step += 1;
        if terminal {
            cursor.finished = true;
            debug!(
                episode = cursor.episode,
                total_reward = cursor.summary.total_reward,
                executes = cursor.summary.executes,
                defects = cursor.summary.defects,
                "episode finished"
            );
            for sink in &mut self.sinks {
                sink.episode_finished(&cursor.summary)?;
            }
        }

        Ok(StepOutcome {
            action: decoded,
            executed,
            response,
            reward,
            td_error,
            next_action,
            terminal,
        })
    }

    /// Fire the pending spec and fold the response into the observation.
    ///
    /// The dials reset whatever happens. A failed call leaves the last
    /// status and verb untouched.
    fn execute(&mut self, cursor: &mut EpisodeCursor) -> (Option<ExecutedSpec>, Option<ApiResponse>) {
        let resolved = cursor.pending.resolve();
        cursor.pending.reset();
        mirror_dials(&cursor.pending, &mut cursor.observation);
        cursor.observation.steps_since_execute = 0;

        let Some(spec) = resolved else {
            return (None, None);
        };

        let response = match self.build_request(&spec) {
            Some(request) => match self.service.send(&request) {
                Ok(response) => {
                    debug!(
                        episode = cursor.episode,
                        step = cursor.step,
                        spec = %spec,
                        status = response.status,
                        "request executed"
                    );
                    Some(response)
                }
                Err(err) => {
                    warn!(
                        episode = cursor.episode,
                        step = cursor.step,
                        spec = %spec,
                        error = %err,
                        "request failed, scoring as no response"
                    );
                    None
                }
            },
            None => {
                debug!(
                    episode = cursor.episode,
                    step = cursor.step,
                    spec = %spec,
                    "no identifier held for target, request not sent"
                );
                None
            }
        };

        let response = response.and_then(|response| match self.identifiers.absorb(&spec, &response) {
            Ok(()) => Some(response),
            Err(err) => {
                warn!(
                    episode = cursor.episode,
                    step = cursor.step,
                    spec = %spec,
                    status = response.status,
                    error = %err,
                    "malformed response, scoring as no response"
                );
                None
            }
        });
        if let Some(response) = &response {
            cursor.observation.last_status = response.status;
            cursor.observation.last_verb = spec.verb;
        }
        self.identifiers.project(&mut cursor.observation);

        (Some(spec), response)
    }

    /// Wire request for `spec`, or `None` when it addresses a record whose
    /// identifier is not held.
    fn build_request(&mut self, spec: &ExecutedSpec) -> Option<ApiRequest> {
        let method = spec.verb.method()?;
        let collection = format!("/{}", spec.resource.path_segment());
        let path = if spec.verb.needs_identifier() {
            let id = self.identifiers.get(spec.resource)?;
            format!("{collection}/{id}")
        } else {
            collection
        };
        let body = if spec.verb.carries_body() {
            let request = body_request(spec, self.identifiers.parent_of(spec.resource));
            Some(self.payloads.generate_body(&request))
        } else {
            None
        };
        Some(ApiRequest { method, path, body })
    }
}
