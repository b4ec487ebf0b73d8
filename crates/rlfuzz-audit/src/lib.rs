//! # rlfuzz-audit
//!
//! Transition subscribers for the rlfuzz trainer.
//!
//! ## Overview
//!
//! - [`TransitionJournal`] links every recorded transition into a
//!   [`JournalEntry`] chain rooted at the run id. Editing any entry breaks
//!   the chain and `verify_chain` reports the first [`ChainBreak`]. The
//!   journal can stream JSON lines as it goes and cap what it keeps in
//!   memory.
//! - [`WindowStats`] aggregates the stream into one [`WindowReport`] per
//!   window of episodes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rlfuzz_audit::{TransitionJournal, WindowStats};
//!
//! let journal = TransitionJournal::new(trainer.run_id().to_string())
//!     .with_retention(1_000)
//!     .streaming_to(Path::new("run.jsonl"))?;
//! let stats = WindowStats::new(config.log_every);
//! let mut trainer = trainer
//!     .with_sink(Box::new(journal.clone()))
//!     .with_sink(Box::new(stats.clone()));
//! trainer.run()?;
//!
//! journal.verify_integrity()?;
//! ```

pub mod digest;
pub mod entry;
pub mod journal;
pub mod stats;

pub use digest::{entry_digest, root_digest, verify_chain, verify_segment, ChainBreak};
pub use entry::{JournalEntry, JournalSeal};
pub use journal::{JournalFilter, TransitionJournal};
pub use stats::{WindowReport, WindowStats};

// ── Tests ─────────────────────────────────────────────────────────────────────
