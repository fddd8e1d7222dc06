//! Primary ranking inference
//!
//! First stage of the recommendation flow: hand the customer profile to
//! the external ranking unit, get back an ordered list of candidate
//! policies. The unit is free to answer in any of three historical
//! shapes; this crate normalizes all of them into one canonical
//! [`Ranking`] before anything downstream sees the data.
//!
//! A failure here fails the whole request, unlike per-policy trust
//! scoring, which degrades per item: without candidates there is
//! nothing left to score.

mod error;
mod ranker;
mod types;

pub use error::{InferenceError, Result};
pub use ranker::{DEFAULT_RANKING_TIMEOUT, PrimaryRanker, parse_ranking};
pub use types::{
    Candidate, DEFAULT_CANDIDATE_NAME, DEFAULT_WHY, Ranking, RankingResponse,
    RecommendationRequest, UserProfile,
};
