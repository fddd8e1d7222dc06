//! Trust-scoring request and result types

use catalog::PolicyMetadata;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::ScoreFailure;

/// Score substituted whenever a unit cannot produce a real one.
pub const NEUTRAL_TRUST_SCORE: f64 = 0.5;

// ============================================================================
// Result vocabulary
// ============================================================================

/// Qualitative confidence reported by a scoring unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ConfidenceLevel::Low => "Low",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::High => "High",
        };
        write!(f, "{text}")
    }
}

/// The unit's prose reading of a score: a trust level, what it means,
/// and what the customer should do about it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrustInterpretation {
    pub level: String,
    pub description: String,
    pub recommendation: String,
}

impl TrustInterpretation {
    /// The neutral interpretation attached to every fallback result.
    pub fn fallback(description: impl Into<String>) -> Self {
        Self {
            level: "Medium Trust".to_string(),
            description: description.into(),
            recommendation: "Review Carefully".to_string(),
        }
    }
}

// ============================================================================
// Wire format
// ============================================================================

/// The document a scoring unit writes to stdout.
///
/// `success: false` is a legitimate answer (the unit ran, the score did
/// not work out); everything else is optional on the wire and validated
/// during interpretation.
#[derive(Debug, Clone, Deserialize)]
pub struct ScorerResponse {
    pub success: bool,
    #[serde(default)]
    pub trust_score: Option<f64>,
    #[serde(default)]
    pub confidence_level: Option<ConfidenceLevel>,
    #[serde(default)]
    pub interpretation: Option<TrustInterpretation>,
    #[serde(default)]
    pub component_scores: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

// ============================================================================
// Requests and results
// ============================================================================

/// Everything one scoring invocation needs: the policy, the customer,
/// and the catalog metadata the unit conditions on.
#[derive(Debug, Clone)]
pub struct ItemScoreRequest {
    pub policy_name: String,
    /// Flat customer document, identical to the ranking payload
    pub user_payload: Value,
    pub metadata: PolicyMetadata,
}

impl ItemScoreRequest {
    pub fn new(policy_name: impl Into<String>, user_payload: Value, metadata: PolicyMetadata) -> Self {
        Self {
            policy_name: policy_name.into(),
            user_payload,
            metadata,
        }
    }

    /// The policy-side document handed to the unit as its second
    /// argument.
    pub fn policy_payload(&self) -> Value {
        json!({
            "name": self.policy_name,
            "type": self.metadata.policy_type,
            "transparency_score": self.metadata.transparency_score,
            "suitability_score": self.metadata.suitability_score,
            "financial_safety_score": self.metadata.financial_safety_score,
            "compliance_score": self.metadata.compliance_score,
        })
    }
}

/// Terminal outcome for one candidate. Every candidate gets exactly one
/// of these, real or fallback; a batch never comes back short.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ItemScoreResult {
    pub trust_score: f64,
    pub confidence: ConfidenceLevel,
    pub interpretation: TrustInterpretation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_scores: Option<Value>,
    /// Present only on fallback results; the batch itself still succeeds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemScoreResult {
    /// Neutral result substituted for a failed invocation.
    pub fn fallback(failure: &ScoreFailure) -> Self {
        Self {
            trust_score: NEUTRAL_TRUST_SCORE,
            confidence: ConfidenceLevel::Medium,
            interpretation: TrustInterpretation::fallback(failure.description()),
            component_scores: None,
            error: Some(failure.to_string()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_payload_carries_the_enrichment_tuple() {
        let request = ItemScoreRequest::new(
            "Term Shield",
            json!({"username": "dev"}),
            PolicyMetadata {
                policy_type: "Term Insurance".to_string(),
                transparency_score: 0.92,
                suitability_score: 0.88,
                financial_safety_score: 0.9,
                compliance_score: 0.95,
            },
        );
        let payload = request.policy_payload();
        assert_eq!(payload["name"], "Term Shield");
        assert_eq!(payload["type"], "Term Insurance");
        assert_eq!(payload["transparency_score"], 0.92);
        assert_eq!(payload["compliance_score"], 0.95);
    }

    #[test]
    fn fallback_result_is_neutral_and_flagged() {
        let result = ItemScoreResult::fallback(&ScoreFailure::Timeout);
        assert_eq!(result.trust_score, NEUTRAL_TRUST_SCORE);
        assert_eq!(result.confidence, ConfidenceLevel::Medium);
        assert_eq!(result.interpretation.level, "Medium Trust");
        assert_eq!(result.interpretation.recommendation, "Review Carefully");
        assert_eq!(result.error.as_deref(), Some("Timeout"));
        assert!(result.is_fallback());
    }

    #[test]
    fn confidence_levels_parse_from_wire_strings() {
        let response: ScorerResponse = serde_json::from_str(
            r#"{"success": true, "trust_score": 0.8, "confidence_level": "High"}"#,
        )
        .unwrap();
        assert_eq!(response.confidence_level, Some(ConfidenceLevel::High));
    }
}
