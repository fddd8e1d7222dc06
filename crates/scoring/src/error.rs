//! Per-item scoring failure classification
//!
//! Unlike ranking failures, none of these ever propagate out of the
//! fan-out: each one is converted into a neutral fallback result for
//! its own item and the batch carries on. The `Display` form of each
//! variant is the `error` string consumers see on the fallback entry,
//! so the wording here is part of the external contract.

use thiserror::Error;

/// Why one trust-scoring invocation produced no usable score.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoreFailure {
    /// The unit exceeded its time limit and was killed
    #[error("Timeout")]
    Timeout,

    /// The unit exited with a non-zero code
    #[error("ExitCode {code}: {stderr}")]
    NonZeroExit { code: String, stderr: String },

    /// The unit exited cleanly but wrote nothing to stdout
    #[error("EmptyOutput")]
    EmptyOutput,

    /// The unit's stdout was not a scoring document we understand
    #[error("ParseError: {0}")]
    Parse(String),

    /// The unit could not be launched or joined at all
    #[error("ProcessError: {0}")]
    Process(String),

    /// The unit ran fine but reported failure in-band (`success: false`)
    #[error("{0}")]
    Reported(String),
}

impl ScoreFailure {
    /// Human-readable sentence for the fallback interpretation record.
    pub fn description(&self) -> String {
        match self {
            ScoreFailure::Timeout => "Trust verification timed out".to_string(),
            ScoreFailure::NonZeroExit { stderr, .. } => {
                format!("Trust verification failed. Error: {stderr}")
            }
            ScoreFailure::EmptyOutput => "Empty trust verification output".to_string(),
            ScoreFailure::Parse(message) => {
                format!("Trust verification parsing failed: {message}")
            }
            ScoreFailure::Process(message) => {
                format!("Trust verification process error: {message}")
            }
            ScoreFailure::Reported(message) => {
                format!("Trust verification failed: {message}")
            }
        }
    }

    /// Classify a completed-but-unclean exit.
    pub fn from_exit(exit_code: Option<i32>, stderr: &str) -> Self {
        let code = match exit_code {
            Some(code) => code.to_string(),
            None => "signal".to_string(),
        };
        ScoreFailure::NonZeroExit {
            code,
            stderr: stderr.trim().to_string(),
        }
    }
}
