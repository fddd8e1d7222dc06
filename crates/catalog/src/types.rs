//! Core types for the policy reference table.
//!
//! The table is tabular data keyed by policy name with a type column and
//! four baseline quality scores. Rows come out of a CSV export of the
//! product team's reference sheet, so every cell other than the name is
//! treated as optional and backed by a per-column default.

use serde::{Deserialize, Serialize};

// =============================================================================
// Per-column defaults
// =============================================================================
// Substituted whenever a policy is missing from the table or a score cell is
// blank. These are the same values the aggregator reports for completely
// unknown policies.

pub const DEFAULT_POLICY_TYPE: &str = "Life Insurance";
pub const DEFAULT_TRANSPARENCY_SCORE: f64 = 0.75;
pub const DEFAULT_SUITABILITY_SCORE: f64 = 0.70;
pub const DEFAULT_FINANCIAL_SAFETY_SCORE: f64 = 0.80;
pub const DEFAULT_COMPLIANCE_SCORE: f64 = 0.85;

/// One row of the reference table, as it appears in the CSV file.
///
/// Header names mirror the source sheet (`Policies`, `Description`), which
/// is why two fields carry serde renames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRecord {
    /// Policy name, the lookup key
    #[serde(rename = "Policies")]
    pub name: String,

    /// Product category (e.g. "Term Insurance", "ULIP")
    #[serde(default)]
    pub policy_type: Option<String>,

    /// How clearly terms and charges are disclosed, in [0, 1]
    #[serde(default)]
    pub transparency_score: Option<f64>,

    /// How broadly the product suits typical buyers, in [0, 1]
    #[serde(default)]
    pub suitability_score: Option<f64>,

    /// Insurer solvency / fund safety indicator, in [0, 1]
    #[serde(default)]
    pub financial_safety_score: Option<f64>,

    /// Regulatory compliance indicator, in [0, 1]
    #[serde(default)]
    pub compliance_score: Option<f64>,

    /// Free-text marketing description, used by the CLI
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
}

impl PolicyRecord {
    /// Resolve this row into concrete metadata, applying the per-column
    /// defaults to any blank cell.
    pub fn metadata(&self) -> PolicyMetadata {
        PolicyMetadata {
            policy_type: self
                .policy_type
                .clone()
                .unwrap_or_else(|| DEFAULT_POLICY_TYPE.to_string()),
            transparency_score: self.transparency_score.unwrap_or(DEFAULT_TRANSPARENCY_SCORE),
            suitability_score: self.suitability_score.unwrap_or(DEFAULT_SUITABILITY_SCORE),
            financial_safety_score: self
                .financial_safety_score
                .unwrap_or(DEFAULT_FINANCIAL_SAFETY_SCORE),
            compliance_score: self.compliance_score.unwrap_or(DEFAULT_COMPLIANCE_SCORE),
        }
    }
}

/// Static per-policy metadata handed to scoring units and attached to
/// aggregated responses.
///
/// Unlike [`PolicyRecord`] this is fully resolved: no field is optional,
/// unknown policies get the default tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyMetadata {
    pub policy_type: String,
    pub transparency_score: f64,
    pub suitability_score: f64,
    pub financial_safety_score: f64,
    pub compliance_score: f64,
}

impl Default for PolicyMetadata {
    fn default() -> Self {
        Self {
            policy_type: DEFAULT_POLICY_TYPE.to_string(),
            transparency_score: DEFAULT_TRANSPARENCY_SCORE,
            suitability_score: DEFAULT_SUITABILITY_SCORE,
            financial_safety_score: DEFAULT_FINANCIAL_SAFETY_SCORE,
            compliance_score: DEFAULT_COMPLIANCE_SCORE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_applies_column_defaults() {
        let record = PolicyRecord {
            name: "Partial Row".to_string(),
            policy_type: None,
            transparency_score: Some(0.9),
            suitability_score: None,
            financial_safety_score: None,
            compliance_score: Some(0.5),
            description: None,
        };

        let metadata = record.metadata();
        assert_eq!(metadata.policy_type, "Life Insurance");
        assert_eq!(metadata.transparency_score, 0.9);
        assert_eq!(metadata.suitability_score, 0.70);
        assert_eq!(metadata.financial_safety_score, 0.80);
        assert_eq!(metadata.compliance_score, 0.5);
    }

    #[test]
    fn test_default_metadata_tuple() {
        let metadata = PolicyMetadata::default();
        assert_eq!(metadata.policy_type, "Life Insurance");
        assert_eq!(metadata.transparency_score, 0.75);
        assert_eq!(metadata.suitability_score, 0.70);
        assert_eq!(metadata.financial_safety_score, 0.80);
        assert_eq!(metadata.compliance_score, 0.85);
    }
}
