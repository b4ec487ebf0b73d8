//! Journal entries and the sealed journal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rlfuzz_contracts::execution::Transition;

/// One journaled step.
///
/// `index` counts journaled steps only. It lags the trainer's step count
/// when a filter drops dial-turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub index: u64,
    pub transition: Transition,
    /// Digest of the previous entry, or the run's root digest.
    pub parent: String,
    pub digest: String,
}

impl JournalEntry {
    /// Combination key of an execute step, e.g. `POST items quantity/negative/mild`.
    pub fn combination(&self) -> Option<String> {
        self.transition.executed.as_ref().map(ToString::to_string)
    }

    pub fn is_defect(&self) -> bool {
        self.transition.status == Some(500)
    }
}

/// Snapshot of a journal at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalSeal {
    pub run_id: String,
    /// Parent of the chain's first entry.
    pub root: String,
    /// Digest of the last entry, or `root` when nothing was journaled.
    pub head: String,
    /// Entries journaled over the whole run, retained or not.
    pub recorded: u64,
    /// Journaled execute steps that hit a 500.
    pub defects: u64,
    /// Retained entries in chain order. May start past index 0.
    pub entries: Vec<JournalEntry>,
    pub sealed_at: DateTime<Utc>,
}
