//! Response aggregation
//!
//! Final stage of the recommendation flow: take the ordered candidate
//! list from primary inference and the index-aligned trust scores from
//! the fan-out, enrich each pair from the policy catalog, and produce
//! the single envelope the caller sees.
//!
//! Aggregation is pure and infallible. By the time data reaches this
//! crate every per-item failure has already been converted into a
//! fallback score, so the only job left is a positional merge and a
//! timestamp.

mod envelope;
mod merge;

pub use envelope::{AggregatedResponse, COMPLETION_MESSAGE, ScoredPolicy};
pub use merge::aggregate;
