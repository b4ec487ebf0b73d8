//! Digest chaining for journaled transitions.
//!
//! Every run's chain starts from a root derived from its run id, so two runs
//! never share a prefix. Each entry's digest covers, in order:
//!   1. the parent digest as its 64 ASCII hex bytes
//!   2. the entry index as 8-byte big-endian
//!   3. the byte length of the transition JSON as 8-byte big-endian
//!   4. the transition as compact JSON

use sha2::{Digest, Sha256};
use thiserror::Error;

use rlfuzz_contracts::{
    error::{FuzzError, FuzzResult},
    execution::Transition,
};

use crate::entry::JournalEntry;

const ROOT_DOMAIN: &[u8] = b"rlfuzz-journal/v1\n";

/// Where verification of a chain stopped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainBreak {
    #[error("entry at position {position} carries index {found}")]
    OutOfOrder { position: u64, found: u64 },

    #[error("entry {index} does not link to its predecessor")]
    BrokenLink { index: u64 },

    #[error("entry {index} digest does not match its content")]
    DigestMismatch { index: u64 },
}

/// Parent digest of the first entry of `run_id`'s chain.
pub fn root_digest(run_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ROOT_DOMAIN);
    hasher.update(run_id.as_bytes());
    hex::encode(hasher.finalize())
}

/// Digest of the transition journaled at `index` after `parent`.
pub fn entry_digest(parent: &str, index: u64, transition: &Transition) -> FuzzResult<String> {
    let body = serde_json::to_vec(transition).map_err(|e| FuzzError::JournalWriteFailed {
        reason: format!("transition at episode {} step {} not serializable: {}", transition.episode, transition.step, e),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(parent.as_bytes());
    hasher.update(index.to_be_bytes());
    hasher.update((body.len() as u64).to_be_bytes());
    hasher.update(&body);
    Ok(hex::encode(hasher.finalize()))
}

/// Verify a whole chain for `run_id`, starting at its root.
pub fn verify_chain(run_id: &str, entries: &[JournalEntry]) -> Result<(), ChainBreak> {
    verify_segment(&root_digest(run_id), 0, entries)
}

/// Verify a contiguous run of entries whose first element sits at
/// `first_index` and links to `parent`. An empty segment is valid.
pub fn verify_segment(parent: &str, first_index: u64, entries: &[JournalEntry]) -> Result<(), ChainBreak> {
    let mut expected_parent = parent;
    for (position, entry) in (first_index..).zip(entries) {
        if entry.index != position {
            return Err(ChainBreak::OutOfOrder {
                position,
                found: entry.index,
            });
        }
        if entry.parent != expected_parent {
            return Err(ChainBreak::BrokenLink { index: entry.index });
        }
        match entry_digest(&entry.parent, entry.index, &entry.transition) {
            Ok(recomputed) if recomputed == entry.digest => {}
            _ => return Err(ChainBreak::DigestMismatch { index: entry.index }),
        }
        expected_parent = &entry.digest;
    }
    Ok(())
}
