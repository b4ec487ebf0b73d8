//! The server-error oracle.
//!
//! The bug signal is exactly "the service answered 500". Everything else that
//! answered scores 0, and a step with no answer at all scores the configured
//! no-response penalty.
//!
//! Every 500 is also filed in a `DefectRegistry` keyed by the executed
//! combination. The registry is reporting only: first hits and repeats earn
//! the same reward.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, PoisonError},
};

use serde::{Deserialize, Serialize};
use tracing::warn;

use rlfuzz_contracts::{
    config::RewardConfig,
    execution::{ApiResponse, ExecutedSpec},
};
use rlfuzz_core::traits::Oracle;

/// One distinct defect-triggering combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Stable key, e.g. `POST items quantity/negative/mild`.
    pub combination: String,
    pub spec: ExecutedSpec,
    pub hits: u64,
    pub first_episode: u64,
    pub first_step: u32,
}

/// Distinct defect combinations seen so far, with hit counts.
#[derive(Debug, Default)]
pub struct DefectRegistry {
    findings: BTreeMap<String, Finding>,
    total_hits: u64,
}

impl DefectRegistry {
    /// File one hit. Returns true when the combination is new.
    pub fn record(&mut self, spec: &ExecutedSpec, episode: u64, step: u32) -> bool {
        self.total_hits += 1;
        let combination = spec.to_string();
        if let Some(existing) = self.findings.get_mut(&combination) {
            existing.hits += 1;
            return false;
        }
        self.findings.insert(
            combination.clone(),
            Finding {
                combination,
                spec: *spec,
                hits: 1,
                first_episode: episode,
                first_step: step,
            },
        );
        true
    }

    pub fn unique_count(&self) -> usize {
        self.findings.len()
    }

    pub fn total_hits(&self) -> u64 {
        self.total_hits
    }

    /// All findings, most hits first, then by combination.
    pub fn findings(&self) -> Vec<Finding> {
        let mut all: Vec<Finding> = self.findings.values().cloned().collect();
        all.sort_by(|a, b| b.hits.cmp(&a.hits).then_with(|| a.combination.cmp(&b.combination)));
        all
    }
}

/// `Oracle` that rewards HTTP 500 responses.
///
/// Cloning shares the registry, so a caller can keep a handle for reporting
/// after boxing one clone into the trainer.
#[derive(Debug, Clone)]
pub struct ServerErrorOracle {
    rewards: RewardConfig,
    registry: Arc<Mutex<DefectRegistry>>,
    episode: u64,
    step: u32,
}

impl ServerErrorOracle {
    pub fn new(rewards: RewardConfig) -> Self {
        Self {
            rewards,
            registry: Arc::new(Mutex::new(DefectRegistry::default())),
            episode: 0,
            step: 0,
        }
    }

    pub fn unique_count(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .unique_count()
    }

    pub fn total_hits(&self) -> u64 {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .total_hits()
    }

    pub fn findings(&self) -> Vec<Finding> {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .findings()
    }
}

impl Default for ServerErrorOracle {
    fn default() -> Self {
        Self::new(RewardConfig::default())
    }
}

impl Oracle for ServerErrorOracle {
    fn begin_step(&mut self, episode: u64, step: u32) {
        self.episode = episode;
        self.step = step;
    }

    fn reward(&mut self, response: Option<&ApiResponse>, executed: Option<&ExecutedSpec>) -> f64 {
        let Some(response) = response else {
            return self.rewards.no_response;
        };
        if !response.is_server_error() {
            return 0.0;
        }

        if let Some(spec) = executed {
            let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
            if registry.record(spec, self.episode, self.step) {
                warn!(
                    episode = self.episode,
                    step = self.step,
                    combination = %spec,
                    unique = registry.unique_count(),
                    "new defect combination"
                );
            }
        }
        self.rewards.defect
    }
}
