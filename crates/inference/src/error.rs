//! Error types for primary ranking inference

use thiserror::Error;

/// Errors that abort a recommendation request at the ranking stage.
///
/// There is nothing to trust-score without candidates, so these are not
/// absorbed into fallback results the way per-policy scoring failures
/// are; they surface to the caller.
#[derive(Error, Debug)]
pub enum InferenceError {
    /// The ranking unit exited cleanly but wrote nothing to stdout
    #[error("ranking unit produced no output")]
    NoOutput,

    /// The ranking unit could not run, or reported failure
    #[error("ranking unit failed: {0}")]
    WorkerFailed(String),

    /// The ranking unit's output was not a JSON document we understand
    #[error("ranking output could not be parsed: {0}")]
    InvalidFormat(String),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, InferenceError>;
