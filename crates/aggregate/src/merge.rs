//! Positional merge of candidates, scores, and catalog metadata

use catalog::PolicyCatalog;
use chrono::Utc;
use inference::Ranking;
use scoring::{ItemScoreResult, ScoreFailure};
use tracing::{debug, warn};

use crate::envelope::{AggregatedResponse, COMPLETION_MESSAGE, ScoredPolicy};

/// Merge one ranking with its settled score batch into the final
/// response.
///
/// Pairing is by position: the scores arrive index-aligned with the
/// candidates, so entry `i` of the response is candidate `i` with score
/// `i`, whatever order the scoring invocations actually finished in.
/// Each entry is enriched with catalog metadata for its name; the
/// lookup never fails, unknown policies get the default tuple.
///
/// The response always contains exactly one entry per candidate. Should
/// the score batch ever come back short, the unpaired candidates get
/// the same neutral fallback a dead scoring task gets.
///
/// # Arguments
/// * `catalog` - Read-only reference metadata table
/// * `ranking` - Canonical output of primary inference
/// * `results` - One score per candidate, index-aligned
pub fn aggregate(
    catalog: &PolicyCatalog,
    ranking: &Ranking,
    results: Vec<ItemScoreResult>,
) -> AggregatedResponse {
    if results.len() < ranking.candidates.len() {
        warn!(
            candidates = ranking.candidates.len(),
            results = results.len(),
            "score batch came back short, padding with fallbacks"
        );
    }

    let mut results = results.into_iter();
    let policies: Vec<ScoredPolicy> = ranking
        .candidates
        .iter()
        .map(|candidate| {
            let result = results.next().unwrap_or_else(|| {
                ItemScoreResult::fallback(&ScoreFailure::Process("missing score".to_string()))
            });
            let metadata = catalog.lookup(&candidate.name);
            ScoredPolicy {
                name: candidate.name.clone(),
                why: candidate.why.clone(),
                trust_score: result.trust_score,
                trust_confidence: result.confidence,
                trust_interpretation: result.interpretation,
                trust_error: result.error,
                policy_type: metadata.policy_type.clone(),
                enhanced_scores: metadata,
                component_scores: result.component_scores,
            }
        })
        .collect();

    let response = AggregatedResponse {
        success: true,
        message: COMPLETION_MESSAGE.to_string(),
        policies,
        confidence: ranking.confidence,
        method: ranking.method.clone(),
        trust_verification_timestamp: Utc::now(),
    };
    debug!(
        entries = response.policies.len(),
        fallbacks = response.fallback_count(),
        "response aggregated"
    );
    response
}
