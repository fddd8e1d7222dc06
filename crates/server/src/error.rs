//! Coordinator-level error types

use thiserror::Error;

/// Request problems caught before any computation unit is launched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("description must not be blank")]
    BlankDescription,

    #[error("username must not be blank")]
    BlankUsername,

    #[error("policy name must not be blank")]
    BlankPolicyName,
}

/// Everything that can fail a coordinated request.
///
/// Per-policy scoring failures never reach this level; they degrade
/// into fallback entries inside a successful response.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Inference(#[from] inference::InferenceError),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
