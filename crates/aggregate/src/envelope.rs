//! Caller-facing response envelope

use catalog::PolicyMetadata;
use chrono::{DateTime, Utc};
use scoring::{ConfidenceLevel, TrustInterpretation};
use serde::Serialize;
use serde_json::Value;

/// Message reported on every successfully aggregated response.
pub const COMPLETION_MESSAGE: &str =
    "Policy recommendation with trust verification completed successfully";

/// One candidate merged with its trust outcome and catalog metadata.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoredPolicy {
    pub name: String,
    pub why: String,
    pub trust_score: f64,
    pub trust_confidence: ConfidenceLevel,
    pub trust_interpretation: TrustInterpretation,
    /// Present only when this entry carries a fallback score
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust_error: Option<String>,
    pub policy_type: String,
    /// The catalog metadata tuple the scoring unit conditioned on
    pub enhanced_scores: PolicyMetadata,
    /// Per-component score breakdown, when the unit reported one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_scores: Option<Value>,
}

impl ScoredPolicy {
    /// True when this entry carries a substituted neutral score.
    pub fn is_fallback(&self) -> bool {
        self.trust_error.is_some()
    }
}

/// The complete response for one recommendation request.
///
/// `success` reflects the primary ranking only; entries that fell back
/// to neutral scores still ship inside a successful envelope, each
/// flagged by its own `trust_error`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AggregatedResponse {
    pub success: bool,
    pub message: String,
    pub policies: Vec<ScoredPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub trust_verification_timestamp: DateTime<Utc>,
}

impl AggregatedResponse {
    /// Count of entries carrying fallback scores.
    pub fn fallback_count(&self) -> usize {
        self.policies.iter().filter(|p| p.is_fallback()).count()
    }
}
