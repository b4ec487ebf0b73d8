//! # rlfuzz-oracle
//!
//! Reward scoring for rlfuzz.
//!
//! This crate provides [`engine::ServerErrorOracle`], which implements the
//! [`rlfuzz_core::traits::Oracle`] trait:
//!
//! - no response → the configured penalty (default −0.15)
//! - any status other than 500 → 0
//! - 500 → the configured defect reward (default +10), and the executed
//!   combination is filed in the defect registry
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use rlfuzz_oracle::engine::ServerErrorOracle;
//!
//! let oracle = ServerErrorOracle::new(config.rewards.clone());
//! let handle = oracle.clone(); // read findings after the run
//! ```

pub mod engine;

pub use engine::{DefectRegistry, Finding, ServerErrorOracle};
