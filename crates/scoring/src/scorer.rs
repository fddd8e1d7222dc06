//! Concurrent fan-out of trust scoring across candidates

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};
use worker::{CommandSpec, WorkerInvocation, WorkerOutcome};

use crate::error::ScoreFailure;
use crate::types::{ItemScoreRequest, ItemScoreResult, ScorerResponse};

/// Hard cap on one scoring invocation.
pub const DEFAULT_SCORING_TIMEOUT: Duration = Duration::from_secs(30);

/// Default ceiling on simultaneously running scoring units.
pub const DEFAULT_MAX_CONCURRENT: usize = 8;

/// Runs the external trust-scoring unit, one invocation per candidate.
///
/// The fan-out is failure-isolating: a candidate whose invocation times
/// out, crashes, or answers garbage gets a neutral fallback result and
/// its siblings never notice. [`TrustScorer::score_all`] therefore has
/// no error type at all; it always returns exactly one result per
/// request, in request order.
///
/// ## Example
///
/// ```ignore
/// let scorer = TrustScorer::new(
///     CommandSpec::new("python3").arg("scripts/score_trust.py"),
/// );
/// let results = scorer.score_all(requests).await;
/// ```
#[derive(Debug, Clone)]
pub struct TrustScorer {
    command: CommandSpec,
    timeout: Duration,
    working_dir: Option<PathBuf>,
    max_concurrent: usize,
}

impl TrustScorer {
    pub fn new(command: CommandSpec) -> Self {
        Self {
            command,
            timeout: DEFAULT_SCORING_TIMEOUT,
            working_dir: None,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }

    /// Override the per-invocation timeout (builder style).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run units from a fixed directory (builder style).
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Cap simultaneous scoring units (builder style, floor of 1).
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Score one candidate, absorbing any failure into a fallback.
    #[instrument(skip(self, request), fields(policy = %request.policy_name))]
    pub async fn score_one(&self, request: &ItemScoreRequest) -> ItemScoreResult {
        match self.try_score(request).await {
            Ok(result) => result,
            Err(failure) => {
                warn!(policy = %request.policy_name, error = %failure, "falling back to neutral trust score");
                ItemScoreResult::fallback(&failure)
            }
        }
    }

    /// Score every candidate concurrently through a bounded task pool.
    ///
    /// Completes only once all invocations have settled; a slow or dead
    /// item costs at most its own timeout and never delays a sibling
    /// beyond permit availability. Results come back in request order
    /// regardless of completion order.
    ///
    /// # Arguments
    /// * `requests` - One entry per candidate, in rank order
    ///
    /// # Returns
    /// * Exactly `requests.len()` results, index-aligned with the input
    #[instrument(skip(self, requests), fields(items = requests.len()))]
    pub async fn score_all(&self, requests: Vec<ItemScoreRequest>) -> Vec<ItemScoreResult> {
        let total = requests.len();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks: JoinSet<(usize, ItemScoreResult)> = JoinSet::new();

        for (index, request) in requests.into_iter().enumerate() {
            // Admission control: hold a permit before spawning so a large
            // candidate list cannot fork an unbounded process swarm. The
            // semaphore is never closed, so acquisition cannot fail.
            let permit = Arc::clone(&semaphore).acquire_owned().await.ok();
            let scorer = self.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let result = scorer.score_one(&request).await;
                (index, result)
            });
        }

        let mut slots: Vec<Option<ItemScoreResult>> = (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => warn!(error = %e, "scoring task died before settling"),
            }
        }

        // A task that panicked never filled its slot; substitute the same
        // neutral fallback so the batch length always matches the input.
        let results: Vec<ItemScoreResult> = slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    ItemScoreResult::fallback(&ScoreFailure::Process(
                        "scoring task aborted".to_string(),
                    ))
                })
            })
            .collect();

        debug!(
            total,
            fallbacks = results.iter().filter(|r| r.is_fallback()).count(),
            "scoring batch settled"
        );
        results
    }

    async fn try_score(
        &self,
        request: &ItemScoreRequest,
    ) -> Result<ItemScoreResult, ScoreFailure> {
        let user_json = request.user_payload.to_string();
        let policy_json = request.policy_payload().to_string();

        let mut invocation = WorkerInvocation::new(self.command.clone(), self.timeout)
            .with_arg(&user_json)
            .with_arg(policy_json)
            .with_input(user_json);
        if let Some(dir) = &self.working_dir {
            invocation = invocation.with_working_dir(dir);
        }

        let outcome = worker::invoke(invocation)
            .await
            .map_err(|e| ScoreFailure::Process(e.to_string()))?;

        match outcome {
            WorkerOutcome::TimedOut => Err(ScoreFailure::Timeout),
            WorkerOutcome::Completed {
                exit_code: Some(0),
                stdout,
                ..
            } => {
                let trimmed = stdout.trim();
                if trimmed.is_empty() {
                    return Err(ScoreFailure::EmptyOutput);
                }
                let response: ScorerResponse = serde_json::from_str(trimmed)
                    .map_err(|e| ScoreFailure::Parse(e.to_string()))?;
                interpret(response)
            }
            WorkerOutcome::Completed {
                exit_code, stderr, ..
            } => Err(ScoreFailure::from_exit(exit_code, &stderr)),
        }
    }
}

/// Turn a parsed scoring document into a terminal result.
fn interpret(response: ScorerResponse) -> Result<ItemScoreResult, ScoreFailure> {
    if !response.success {
        return Err(ScoreFailure::Reported(
            response
                .error
                .unwrap_or_else(|| "scoring unit reported failure".to_string()),
        ));
    }

    let raw_score = response.trust_score.ok_or_else(|| {
        ScoreFailure::Parse("missing trust_score in successful response".to_string())
    })?;
    let confidence = response.confidence_level.ok_or_else(|| {
        ScoreFailure::Parse("missing confidence_level in successful response".to_string())
    })?;
    let interpretation = response.interpretation.ok_or_else(|| {
        ScoreFailure::Parse("missing interpretation in successful response".to_string())
    })?;

    let trust_score = raw_score.clamp(0.0, 1.0);
    if trust_score != raw_score {
        warn!(
            reported = raw_score,
            clamped = trust_score,
            "scoring unit reported an out-of-range trust score"
        );
    }

    Ok(ItemScoreResult {
        trust_score,
        confidence,
        interpretation,
        component_scores: response.component_scores,
        error: None,
    })
}
