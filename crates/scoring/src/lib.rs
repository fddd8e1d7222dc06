//! Per-policy trust scoring
//!
//! Second stage of the recommendation flow. Every candidate the ranker
//! proposed gets its own trust-scoring invocation; the invocations run
//! concurrently through a bounded pool and each one settles
//! independently. The guiding rule is availability over completeness:
//! a candidate whose scoring fails keeps its place in the response with
//! a neutral fallback score and an `error` note, and nothing short of
//! the caller dropping the whole request stops the batch.
//!
//! ## Failure vocabulary
//!
//! The `error` strings on fallback results are part of the external
//! contract (see [`ScoreFailure`]): `Timeout`, `ExitCode {code}:
//! {stderr}`, `EmptyOutput`, `ParseError: {message}`,
//! `ProcessError: {message}`, or the unit's own in-band message.

mod error;
mod scorer;
mod types;

pub use error::ScoreFailure;
pub use scorer::{DEFAULT_MAX_CONCURRENT, DEFAULT_SCORING_TIMEOUT, TrustScorer};
pub use types::{
    ConfidenceLevel, ItemScoreRequest, ItemScoreResult, NEUTRAL_TRUST_SCORE, ScorerResponse,
    TrustInterpretation,
};
