//! # Recommendation Orchestrator
//!
//! This module coordinates the entire recommendation flow:
//! 1. Validate the request (before any unit is launched)
//! 2. Invoke primary ranking inference, one worker invocation
//! 3. Enrich each candidate with catalog metadata
//! 4. Fan out per-policy trust scoring across the candidates
//! 5. Aggregate candidates, scores, and metadata into the envelope
//!
//! The orchestrator owns no concurrency of its own. It suspends once at
//! the ranking invocation and once at the scoring join point; the
//! bounded fan-out lives entirely inside the scoring crate.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument};

use aggregate::AggregatedResponse;
use catalog::PolicyCatalog;
use inference::{PrimaryRanker, Ranking, RecommendationRequest};
use scoring::{ItemScoreRequest, ItemScoreResult, TrustScorer};

use crate::config::OrchestratorConfig;
use crate::error::{Result, ValidationError};

/// Main orchestrator that coordinates the recommendation flow
#[derive(Debug, Clone)]
pub struct RecommendationOrchestrator {
    ranker: PrimaryRanker,
    scorer: TrustScorer,
    catalog: Arc<PolicyCatalog>,
}

impl RecommendationOrchestrator {
    /// Create a new orchestrator from its configuration.
    ///
    /// # Arguments
    /// * `config` - Unit commands, timeouts, and the fan-out bound
    /// * `catalog` - Shared read-only reference metadata table
    pub fn new(config: OrchestratorConfig, catalog: Arc<PolicyCatalog>) -> Self {
        let mut ranker =
            PrimaryRanker::new(config.ranker_command).with_timeout(config.ranker_timeout);
        let mut scorer = TrustScorer::new(config.scorer_command)
            .with_timeout(config.scorer_timeout)
            .with_max_concurrent(config.max_concurrent_scorers);
        if let Some(dir) = config.working_dir {
            ranker = ranker.with_working_dir(&dir);
            scorer = scorer.with_working_dir(&dir);
        }
        Self {
            ranker,
            scorer,
            catalog,
        }
    }

    /// Main entry point: produce a trust-verified recommendation.
    ///
    /// # Arguments
    /// * `request` - The caller's description, username, and profile
    ///
    /// # Returns
    /// The complete envelope: one scored entry per ranked candidate, in
    /// rank order, with fallback entries where scoring failed
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn recommend(&self, request: RecommendationRequest) -> Result<AggregatedResponse> {
        let start_time = Instant::now();

        validate_request(&request)?;

        let ranking = self.ranker.rank(&request).await?;
        info!(
            "Ranked {} candidates for {}",
            ranking.candidates.len(),
            request.username
        );

        let score_requests = self.build_score_requests(&request, &ranking);
        let results = self.scorer.score_all(score_requests).await;
        info!(
            "Scored {} candidates, {} fell back",
            results.len(),
            results.iter().filter(|r| r.is_fallback()).count()
        );

        let response = aggregate::aggregate(&self.catalog, &ranking, results);
        info!(
            "Total time to recommend for {}: {:.2?}",
            request.username,
            start_time.elapsed()
        );
        Ok(response)
    }

    /// Standalone single-policy trust scoring.
    ///
    /// Same enrichment and fallback rules as the fan-out, for callers
    /// that already know which policy they are asking about.
    #[instrument(skip(self, request), fields(username = %request.username, policy = policy_name))]
    pub async fn score_one(
        &self,
        policy_name: &str,
        request: &RecommendationRequest,
    ) -> Result<ItemScoreResult> {
        if policy_name.trim().is_empty() {
            return Err(ValidationError::BlankPolicyName.into());
        }
        if request.username.trim().is_empty() {
            return Err(ValidationError::BlankUsername.into());
        }

        let score_request = ItemScoreRequest::new(
            policy_name,
            request.worker_payload(),
            self.catalog.lookup(policy_name),
        );
        let result = self.scorer.score_one(&score_request).await;
        info!(
            "Scored {} for {}: trust {:.2}",
            policy_name, request.username, result.trust_score
        );
        Ok(result)
    }

    /// Pair every candidate with the customer payload and its catalog
    /// metadata, in rank order.
    fn build_score_requests(
        &self,
        request: &RecommendationRequest,
        ranking: &Ranking,
    ) -> Vec<ItemScoreRequest> {
        let payload = request.worker_payload();
        ranking
            .candidates
            .iter()
            .map(|candidate| {
                ItemScoreRequest::new(
                    &candidate.name,
                    payload.clone(),
                    self.catalog.lookup(&candidate.name),
                )
            })
            .collect()
    }
}

/// Reject incomplete requests before anything is spawned.
fn validate_request(request: &RecommendationRequest) -> std::result::Result<(), ValidationError> {
    if request.description.trim().is_empty() {
        return Err(ValidationError::BlankDescription);
    }
    if request.username.trim().is_empty() {
        return Err(ValidationError::BlankUsername);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrchestratorError;
    use catalog::PolicyRecord;
    use inference::{InferenceError, UserProfile};
    use scoring::ConfidenceLevel;
    use std::path::PathBuf;
    use std::time::Duration;
    use worker::CommandSpec;

    // ============================================================================
    // Test Fixtures
    // ============================================================================

    const SCORER_OK: &str = r#"echo '{"success":true,"trust_score":0.84,"confidence_level":"High","interpretation":{"level":"High Trust","description":"verified","recommendation":"Proceed"}}'"#;

    /// Create a minimal catalog with two known policies
    fn build_test_catalog() -> Arc<PolicyCatalog> {
        Arc::new(PolicyCatalog::from_records(vec![
            PolicyRecord {
                name: "Guardian Shield Term Plan".to_string(),
                policy_type: Some("Term Insurance".to_string()),
                transparency_score: Some(0.92),
                suitability_score: Some(0.88),
                financial_safety_score: Some(0.90),
                compliance_score: Some(0.95),
                description: None,
            },
            PolicyRecord {
                name: "Smart Wealth Builder".to_string(),
                policy_type: Some("ULIP".to_string()),
                transparency_score: Some(0.70),
                suitability_score: Some(0.75),
                financial_safety_score: Some(0.72),
                compliance_score: Some(0.88),
                description: None,
            },
        ]))
    }

    /// Orchestrator whose units are in-test shell scripts
    fn build_test_orchestrator(ranker_script: &str, scorer_script: &str) -> RecommendationOrchestrator {
        let config = OrchestratorConfig::default()
            .with_ranker_command(CommandSpec::shell(ranker_script))
            .with_scorer_command(CommandSpec::shell(scorer_script))
            .with_ranker_timeout(Duration::from_secs(5))
            .with_scorer_timeout(Duration::from_secs(5));
        RecommendationOrchestrator::new(config, build_test_catalog())
    }

    fn request() -> RecommendationRequest {
        RecommendationRequest::new("steady long-term savings", "dev", UserProfile::default())
    }

    fn marker_path(tag: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "trust-recs-orchestrator-{}-{}",
            tag,
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        path
    }

    // ============================================================================
    // End-to-end flow
    // ============================================================================

    #[tokio::test]
    async fn recommend_merges_ranking_scoring_and_catalog() {
        let ranker = r#"echo '{"policies":[{"name":"Guardian Shield Term Plan","why":"strong fit"},{"name":"Smart Wealth Builder","why":"growth"}],"confidence":0.9,"method":"ml_v1"}'"#;
        let orchestrator = build_test_orchestrator(ranker, SCORER_OK);

        let response = orchestrator.recommend(request()).await.unwrap();

        assert!(response.success);
        assert_eq!(response.policies.len(), 2);
        assert_eq!(response.policies[0].name, "Guardian Shield Term Plan");
        assert_eq!(response.policies[0].policy_type, "Term Insurance");
        assert_eq!(response.policies[0].trust_score, 0.84);
        assert_eq!(
            response.policies[0].trust_confidence,
            ConfidenceLevel::High
        );
        assert_eq!(response.policies[1].policy_type, "ULIP");
        assert_eq!(response.confidence, Some(0.9));
        assert_eq!(response.method.as_deref(), Some("ml_v1"));
    }

    #[tokio::test]
    async fn recommend_isolates_scoring_failures_per_policy() {
        let ranker = r#"echo '{"policies":[{"name":"Guardian Shield Term Plan","why":"fit"},{"name":"Broken Policy","why":"legacy"}]}'"#;
        let scorer = concat!(
            r#"case "$1" in "#,
            r#"*Broken*) echo scorer blew up >&2; exit 1 ;; "#,
            r#"*) echo '{"success":true,"trust_score":0.84,"confidence_level":"High","interpretation":{"level":"High Trust","description":"verified","recommendation":"Proceed"}}' ;; "#,
            "esac",
        );
        let orchestrator = build_test_orchestrator(ranker, scorer);

        let response = orchestrator.recommend(request()).await.unwrap();

        assert!(response.success, "per-policy failure must not fail the request");
        assert_eq!(response.policies.len(), 2);
        assert!(!response.policies[0].is_fallback());
        assert!(response.policies[1].is_fallback());
        assert_eq!(
            response.policies[1].trust_error.as_deref(),
            Some("ExitCode 1: scorer blew up")
        );
        // The unknown policy still got enriched, with the default tuple.
        assert_eq!(response.policies[1].policy_type, "Life Insurance");
    }

    #[tokio::test]
    async fn recommend_wraps_an_opaque_ranking_into_one_entry() {
        let orchestrator = build_test_orchestrator("echo '{}'", SCORER_OK);

        let response = orchestrator.recommend(request()).await.unwrap();

        assert_eq!(response.policies.len(), 1);
        assert_eq!(response.policies[0].name, "Unknown Policy");
        assert_eq!(response.policies[0].why, "No description available");
        assert!(!response.policies[0].is_fallback());
    }

    // ============================================================================
    // Failure ordering
    // ============================================================================

    #[tokio::test]
    async fn blank_description_is_rejected_before_any_unit_runs() {
        let marker = marker_path("validate");
        let ranker = format!("touch {}", marker.display());
        let orchestrator = build_test_orchestrator(&ranker, SCORER_OK);

        let bad_request =
            RecommendationRequest::new("   ", "dev", UserProfile::default());
        let err = orchestrator.recommend(bad_request).await.unwrap_err();

        assert!(matches!(
            err,
            OrchestratorError::Validation(ValidationError::BlankDescription)
        ));
        assert!(
            !marker.exists(),
            "validation failure must precede any invocation"
        );
    }

    #[tokio::test]
    async fn blank_username_is_rejected() {
        let orchestrator = build_test_orchestrator("echo '{}'", SCORER_OK);
        let bad_request = RecommendationRequest::new("savings", "", UserProfile::default());
        let err = orchestrator.recommend(bad_request).await.unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Validation(ValidationError::BlankUsername)
        ));
    }

    #[tokio::test]
    async fn silent_ranker_aborts_before_scoring_starts() {
        let marker = marker_path("noscore");
        let scorer = format!("touch {}", marker.display());
        let orchestrator = build_test_orchestrator("exit 0", &scorer);

        let err = orchestrator.recommend(request()).await.unwrap_err();

        assert!(matches!(
            err,
            OrchestratorError::Inference(InferenceError::NoOutput)
        ));
        assert!(
            !marker.exists(),
            "no scoring unit may launch when ranking produced nothing"
        );
    }

    #[tokio::test]
    async fn failed_ranker_fails_the_whole_request() {
        let orchestrator =
            build_test_orchestrator("echo 'model exploded' >&2; exit 3", SCORER_OK);
        let err = orchestrator.recommend(request()).await.unwrap_err();
        match err {
            OrchestratorError::Inference(InferenceError::WorkerFailed(detail)) => {
                assert!(detail.contains("model exploded"), "got: {detail}");
            }
            other => panic!("Expected inference failure, got {:?}", other),
        }
    }

    // ============================================================================
    // Standalone scoring
    // ============================================================================

    #[tokio::test]
    async fn score_one_returns_a_real_score_with_enrichment() {
        let orchestrator = build_test_orchestrator("echo unused", SCORER_OK);

        let result = orchestrator
            .score_one("Guardian Shield Term Plan", &request())
            .await
            .unwrap();

        assert_eq!(result.trust_score, 0.84);
        assert_eq!(result.confidence, ConfidenceLevel::High);
        assert!(!result.is_fallback());
    }

    #[tokio::test]
    async fn score_one_falls_back_like_the_fan_out_does() {
        let orchestrator = build_test_orchestrator("echo unused", "exit 0");

        let result = orchestrator
            .score_one("Guardian Shield Term Plan", &request())
            .await
            .unwrap();

        assert!(result.is_fallback());
        assert_eq!(result.error.as_deref(), Some("EmptyOutput"));
        assert_eq!(result.trust_score, 0.5);
    }

    #[tokio::test]
    async fn score_one_rejects_a_blank_policy_name() {
        let orchestrator = build_test_orchestrator("echo unused", SCORER_OK);
        let err = orchestrator.score_one("  ", &request()).await.unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Validation(ValidationError::BlankPolicyName)
        ));
    }
}
