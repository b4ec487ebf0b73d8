//! Training hyperparameters.
//!
//! Deserialized from TOML by `rlfuzz-policy::config`. Every field has a
//! default so a config file only needs to name what it changes:
//!
//! ```toml
//! episodes = 5000
//! epsilon = 0.05
//!
//! [rewards]
//! defect = 10.0
//!
//! [service]
//! base_url = "http://localhost:8080/api"
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    error::{FuzzError, FuzzResult},
    observation::STEP_COUNTER_CAP,
};

/// Hyperparameters fixed for the duration of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub episodes: u64,
    /// Steps per episode; the last one is terminal.
    pub step_limit: u32,
    /// Exploration probability for masked ε-greedy.
    pub epsilon: f64,
    pub learning_rate: f64,
    /// SARSA discount factor γ.
    pub discount: f64,
    /// Seed for every random stream in the run.
    pub seed: u64,
    pub hidden_units: usize,
    /// TD errors are clipped to `[-error_clip, error_clip]` before use.
    pub error_clip: f64,
    pub step_counter_cap: u32,
    /// Statistics window length, in episodes.
    pub log_every: u64,
    pub rewards: RewardConfig,
    pub service: ServiceConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            episodes: 200_000,
            step_limit: 35,
            epsilon: 0.01,
            learning_rate: 0.01,
            discount: 1.0,
            seed: 1234,
            hidden_units: 8,
            error_clip: 10.0,
            step_counter_cap: STEP_COUNTER_CAP,
            log_every: 10_000,
            rewards: RewardConfig::default(),
            service: ServiceConfig::default(),
        }
    }
}

impl TrainingConfig {
    /// Seed for value-function weight initialization.
    pub fn init_seed(&self) -> u64 {
        self.seed
    }

    /// Seed for the exploration stream of the action selector.
    pub fn exploration_seed(&self) -> u64 {
        self.seed.wrapping_add(1)
    }

    /// Seed for randomized payload choices.
    pub fn payload_seed(&self) -> u64 {
        self.seed.wrapping_add(2)
    }

    /// Reject values no run can use.
    pub fn validate(&self) -> FuzzResult<()> {
        let fail = |reason: String| Err(FuzzError::ConfigError { reason });

        if self.step_limit == 0 {
            return fail("step_limit must be > 0".to_string());
        }
        if self.hidden_units == 0 {
            return fail("hidden_units must be > 0".to_string());
        }
        if self.step_counter_cap == 0 {
            return fail("step_counter_cap must be > 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            return fail(format!("epsilon {} outside [0, 1]", self.epsilon));
        }
        if !(0.0..=1.0).contains(&self.discount) {
            return fail(format!("discount {} outside [0, 1]", self.discount));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return fail(format!("learning_rate {} must be positive", self.learning_rate));
        }
        if self.error_clip.is_nan() || self.error_clip <= 0.0 {
            return fail(format!("error_clip {} must be positive", self.error_clip));
        }
        if self.log_every == 0 {
            return fail("log_every must be > 0".to_string());
        }
        Ok(())
    }
}

/// Reward constants used by the oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Reward for an HTTP 500.
    pub defect: f64,
    /// Reward for a step that produced no response (dial-turns and failed
    /// executions alike).
    pub no_response: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            defect: 10.0,
            no_response: -0.15,
        }
    }
}

/// Where and how to reach a live service under test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            timeout_ms: 5_000,
        }
    }
}
