//! # rlfuzz-policy
//!
//! The learned policy's moving parts: the action-value network the trainer
//! reads and updates, and the TOML loader for its hyperparameters.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use rlfuzz_policy::{config, QNetwork};
//!
//! let cfg = config::from_file(Path::new("train.toml"))?;
//! let net = QNetwork::from_config(&cfg)?;
//! // Pass `Box::new(net)` to `rlfuzz_core::Trainer::new(...)`.
//! ```

pub mod config;
pub mod network;

pub use network::QNetwork;

// ── Tests ─────────────────────────────────────────────────────────────────────
