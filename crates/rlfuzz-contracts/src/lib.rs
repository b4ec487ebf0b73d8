//! # rlfuzz-contracts
//!
//! Shared types, the action schema, and error contracts for the rlfuzz
//! engine.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate: only data definitions, index tables, and error types.

pub mod action;
pub mod config;
pub mod dial;
pub mod error;
pub mod execution;
pub mod observation;
