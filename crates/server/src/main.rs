//! Simple test harness for the recommendation orchestrator.
//!
//! This binary drives the end-to-end flow once with a sample customer:
//! catalog load, assistant supervision, ranking, trust scoring, and
//! aggregation, with the demo units under `scripts/`.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use catalog::PolicyCatalog;
use inference::{RecommendationRequest, UserProfile};
use server::{OrchestratorConfig, RecommendationOrchestrator};
use worker::{CommandSpec, Supervisor};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("info,server=debug,scoring=debug,inference=debug")
        .init();

    info!("Starting TrustRecs server test harness");

    info!("Loading policy catalog...");
    let catalog_path = Path::new("data/policies.csv");
    let catalog = Arc::new(
        PolicyCatalog::load_from_csv(catalog_path)
            .with_context(|| format!("Failed to load catalog from {}", catalog_path.display()))?,
    );
    info!("Catalog loaded with {} policies", catalog.len());

    // Keep the assistant service alive beside the request path.
    let mut assistant = Supervisor::new(
        CommandSpec::new("python3").arg("scripts/assistant_service.py"),
    );
    assistant.start();

    let orchestrator = RecommendationOrchestrator::new(OrchestratorConfig::default(), catalog);

    let request = RecommendationRequest::new(
        "Looking for a low-risk savings plan to support retirement",
        "demo_user",
        UserProfile::default(),
    );

    info!("Requesting recommendations for {}", request.username);
    let response = orchestrator
        .recommend(request)
        .await
        .context("Recommendation request failed")?;

    info!(
        "Received {} policies ({} fallbacks):",
        response.policies.len(),
        response.fallback_count()
    );
    for (i, policy) in response.policies.iter().enumerate() {
        info!(
            "{}. {} [{}] - Trust: {:.2} ({})",
            i + 1,
            policy.name,
            policy.policy_type,
            policy.trust_score,
            policy.trust_confidence,
        );
        info!("   {}", policy.why);
        info!(
            "   {}: {}",
            policy.trust_interpretation.level, policy.trust_interpretation.recommendation
        );
        if let Some(error) = &policy.trust_error {
            info!("   Degraded: {}", error);
        }
    }
    info!(
        "Method: {}, confidence: {}, verified at {}",
        response.method.as_deref().unwrap_or("n/a"),
        response
            .confidence
            .map(|c| format!("{c:.2}"))
            .unwrap_or_else(|| "n/a".to_string()),
        response.trust_verification_timestamp
    );

    assistant.stop().await;

    Ok(())
}
