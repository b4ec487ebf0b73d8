//! Error types for the rlfuzz engine.
//!
//! Two families are kept apart on purpose:
//!
//! - `FuzzError` covers caller bugs and configuration problems. These fail
//!   fast and propagate out of the trainer.
//! - `EnvironmentError` covers anything the service under test can do to us
//!   (transport failures, timeouts, unreadable bodies). The trainer scores
//!   these as "no response" and keeps going; they never abort an episode.

use thiserror::Error;

/// The unified error type for the rlfuzz engine.
#[derive(Debug, Error)]
pub enum FuzzError {
    /// A caller passed an argument that can never be valid (zero-sized
    /// network, negative budget, etc.).
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// A feature vector did not match the value function's input dimension.
    #[error("feature dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An action index fell outside `[0, count)`.
    #[error("action index {index} out of range for {count} actions")]
    ActionOutOfRange { index: usize, count: usize },

    /// Action selection was asked to choose from an all-false mask.
    #[error("no legal actions in mask")]
    NoLegalActions,

    /// A configuration value is missing, malformed, or out of range.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// A transition subscriber could not persist a record.
    #[error("journal write failed: {reason}")]
    JournalWriteFailed { reason: String },
}

/// Convenience alias used throughout the rlfuzz crates.
pub type FuzzResult<T> = Result<T, FuzzError>;

/// Failures raised by a `ServiceUnderTest` while executing a request.
///
/// None of these are bugs in the engine. The trainer converts every variant
/// into a "no response" observation.
#[derive(Debug, Error)]
pub enum EnvironmentError {
    /// The request never produced an HTTP status (connection refused, reset, DNS).
    #[error("transport failure: {reason}")]
    Transport { reason: String },

    /// The request exceeded the client-side deadline.
    #[error("request timed out after {millis} ms")]
    Timeout { millis: u64 },

    /// A status arrived but the body could not be read.
    #[error("malformed response: {reason}")]
    MalformedResponse { reason: String },
}
