//! Transition journal.
//!
//! `TransitionJournal` links every admitted transition into a digest chain
//! rooted at the run id. Clones share the chain, so the caller keeps one
//! handle and boxes another into the trainer as a `TransitionSink`.
//!
//! With a stream attached, each entry is written as one JSON line the moment
//! it is recorded, and `finalize` flushes. A retention limit bounds how many
//! entries stay in memory; the retained tail still verifies against the
//! digest of the last evicted entry.

use std::{
    collections::VecDeque,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::Utc;
use tracing::{debug, info, warn};

use rlfuzz_contracts::{
    error::{FuzzError, FuzzResult},
    execution::Transition,
};
use rlfuzz_core::traits::TransitionSink;

use crate::{
    digest::{entry_digest, root_digest, verify_segment, ChainBreak},
    entry::{JournalEntry, JournalSeal},
};

/// Which transitions the journal keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JournalFilter {
    #[default]
    All,
    /// Only execute steps (those that carry an executed spec).
    ExecutesOnly,
}

impl JournalFilter {
    fn admits(self, transition: &Transition) -> bool {
        match self {
            JournalFilter::All => true,
            JournalFilter::ExecutesOnly => transition.executed.is_some(),
        }
    }
}

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct JournalState {
    pub(crate) entries: VecDeque<JournalEntry>,
    next_index: u64,
    /// Digest of the newest entry, or the root before any.
    head: String,
    /// Parent of the oldest retained entry.
    tail_parent: String,
    defects: u64,
    stream: Option<Box<dyn Write + Send>>,
}

// ── Public journal ────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct TransitionJournal {
    run_id: String,
    root: String,
    filter: JournalFilter,
    keep_last: Option<usize>,
    pub(crate) state: Arc<Mutex<JournalState>>,
}

impl TransitionJournal {
    pub fn new(run_id: impl Into<String>) -> Self {
        let run_id = run_id.into();
        let root = root_digest(&run_id);
        let state = JournalState {
            entries: VecDeque::new(),
            next_index: 0,
            head: root.clone(),
            tail_parent: root.clone(),
            defects: 0,
            stream: None,
        };
        Self {
            run_id,
            root,
            filter: JournalFilter::All,
            keep_last: None,
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn with_filter(mut self, filter: JournalFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Keep only the newest `keep_last` entries in memory.
    pub fn with_retention(mut self, keep_last: usize) -> Self {
        self.keep_last = Some(keep_last);
        self
    }

    /// Write every entry to `stream` as one JSON line when it is recorded.
    pub fn streaming_into(self, stream: Box<dyn Write + Send>) -> Self {
        self.lock().stream = Some(stream);
        self
    }

    /// `streaming_into` a freshly created file at `path`.
    pub fn streaming_to(self, path: &Path) -> FuzzResult<Self> {
        let file = File::create(path).map_err(|e| FuzzError::JournalWriteFailed {
            reason: format!("cannot create '{}': {}", path.display(), e),
        })?;
        info!(path = %path.display(), run_id = %self.run_id, "streaming journal");
        Ok(self.streaming_into(Box::new(BufWriter::new(file))))
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Entries currently held in memory.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries journaled since the start of the run.
    pub fn recorded(&self) -> u64 {
        self.lock().next_index
    }

    pub fn head(&self) -> String {
        self.lock().head.clone()
    }

    /// Snapshot of the retained entries and the chain's end points.
    pub fn seal(&self) -> JournalSeal {
        let state = self.lock();
        JournalSeal {
            run_id: self.run_id.clone(),
            root: self.root.clone(),
            head: state.head.clone(),
            recorded: state.next_index,
            defects: state.defects,
            entries: state.entries.iter().cloned().collect(),
            sealed_at: Utc::now(),
        }
    }

    /// Check ordering, linkage and digests of the retained entries.
    pub fn verify_integrity(&self) -> Result<(), ChainBreak> {
        let mut state = self.lock();
        let first_index = state.next_index - state.entries.len() as u64;
        let parent = state.tail_parent.clone();
        verify_segment(&parent, first_index, state.entries.make_contiguous())
    }

    fn lock(&self) -> MutexGuard<'_, JournalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_for_write(&self) -> FuzzResult<MutexGuard<'_, JournalState>> {
        self.state.lock().map_err(|e| FuzzError::JournalWriteFailed {
            reason: format!("journal state lock poisoned: {}", e),
        })
    }
}

fn write_failed(e: impl std::fmt::Display) -> FuzzError {
    FuzzError::JournalWriteFailed {
        reason: e.to_string(),
    }
}

// ── TransitionSink impl ───────────────────────────────────────────────────────

impl TransitionSink for TransitionJournal {
    /// Link one transition into the chain, streaming it first when a stream
    /// is attached. A failed write leaves the chain unchanged.
    fn record(&mut self, transition: &Transition) -> FuzzResult<()> {
        if !self.filter.admits(transition) {
            return Ok(());
        }

        let mut state = self.lock_for_write()?;
        let index = state.next_index;
        let digest = entry_digest(&state.head, index, transition)?;
        let entry = JournalEntry {
            index,
            transition: transition.clone(),
            parent: state.head.clone(),
            digest,
        };

        if let Some(stream) = state.stream.as_mut() {
            serde_json::to_writer(&mut *stream, &entry).map_err(write_failed)?;
            stream.write_all(b"\n").map_err(write_failed)?;
        }

        if entry.is_defect() {
            state.defects += 1;
        }
        state.head = entry.digest.clone();
        state.next_index += 1;
        state.entries.push_back(entry);

        if let Some(keep_last) = self.keep_last {
            while state.entries.len() > keep_last {
                if let Some(evicted) = state.entries.pop_front() {
                    debug!(index = evicted.index, "journal entry evicted from memory");
                    state.tail_parent = evicted.digest;
                }
            }
        }
        Ok(())
    }

    fn finalize(&mut self, run_id: &str) -> FuzzResult<()> {
        if run_id != self.run_id {
            warn!(
                journal_run_id = %self.run_id,
                trainer_run_id = %run_id,
                "journal finalized by a different run"
            );
        }
        let mut state = self.lock_for_write()?;
        if let Some(stream) = state.stream.as_mut() {
            stream.flush().map_err(write_failed)?;
        }

        info!(
            run_id = %self.run_id,
            recorded = state.next_index,
            retained = state.entries.len(),
            defects = state.defects,
            head = %state.head,
            "transition journal finalized"
        );
        Ok(())
    }
}
