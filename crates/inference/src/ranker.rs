//! Invocation of the primary ranking unit

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, instrument, warn};
use worker::{CommandSpec, WorkerInvocation, WorkerOutcome};

use crate::error::{InferenceError, Result};
use crate::types::{Ranking, RankingResponse, RecommendationRequest};

/// Hard cap on one ranking invocation.
pub const DEFAULT_RANKING_TIMEOUT: Duration = Duration::from_secs(60);

/// Invokes the external ranking unit once per request and normalizes
/// whatever it answers into a [`Ranking`].
///
/// ## Example
///
/// ```ignore
/// let ranker = PrimaryRanker::new(
///     CommandSpec::new("python3").arg("scripts/rank_policies.py"),
/// );
/// let ranking = ranker.rank(&request).await?;
/// ```
#[derive(Debug, Clone)]
pub struct PrimaryRanker {
    command: CommandSpec,
    timeout: Duration,
    working_dir: Option<PathBuf>,
}

impl PrimaryRanker {
    pub fn new(command: CommandSpec) -> Self {
        Self {
            command,
            timeout: DEFAULT_RANKING_TIMEOUT,
            working_dir: None,
        }
    }

    /// Override the invocation timeout (builder style).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the unit from a fixed directory (builder style).
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Obtain the ranked candidate list for one request.
    ///
    /// The serialized request travels both as the first argument and on
    /// stdin; units read whichever side they were written against. The
    /// username rides along as the second argument.
    ///
    /// # Arguments
    /// * `request` - The validated recommendation request
    ///
    /// # Returns
    /// * `Ok(Ranking)` - Ordered candidates plus prediction metadata
    /// * `Err(InferenceError)` - The unit failed; the request is over
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn rank(&self, request: &RecommendationRequest) -> Result<Ranking> {
        let payload = request.worker_payload().to_string();

        let mut invocation = WorkerInvocation::new(self.command.clone(), self.timeout)
            .with_arg(&payload)
            .with_arg(&request.username)
            .with_input(payload);
        if let Some(dir) = &self.working_dir {
            invocation = invocation.with_working_dir(dir);
        }

        let outcome = worker::invoke(invocation)
            .await
            .map_err(|e| InferenceError::WorkerFailed(e.to_string()))?;

        match outcome {
            WorkerOutcome::TimedOut => {
                warn!("ranking unit hit its time limit");
                Err(InferenceError::WorkerFailed(
                    "ranking unit timed out".to_string(),
                ))
            }
            WorkerOutcome::Completed {
                exit_code: Some(0),
                stdout,
                ..
            } => {
                let ranking = parse_ranking(&stdout)?;
                debug!(
                    candidates = ranking.candidates.len(),
                    confidence = ?ranking.confidence,
                    "ranking normalized"
                );
                Ok(ranking)
            }
            WorkerOutcome::Completed {
                exit_code, stderr, ..
            } => {
                let detail = if stderr.trim().is_empty() {
                    match exit_code {
                        Some(code) => format!("exited with code {code}"),
                        None => "terminated by signal".to_string(),
                    }
                } else {
                    stderr.trim().to_string()
                };
                warn!(exit_code = ?exit_code, "ranking unit failed");
                Err(InferenceError::WorkerFailed(detail))
            }
        }
    }
}

/// Parse and normalize one ranking document from captured stdout.
///
/// Ordering of the checks matters: emptiness first, then JSON validity,
/// then an in-band `"error"` report (units may signal failure this way
/// while still exiting 0), then shape resolution.
pub fn parse_ranking(stdout: &str) -> Result<Ranking> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(InferenceError::NoOutput);
    }

    let value: serde_json::Value = serde_json::from_str(trimmed)
        .map_err(|e| InferenceError::InvalidFormat(e.to_string()))?;

    if let Some(reported) = value.get("error") {
        if !reported.is_null() {
            let message = reported
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| reported.to_string());
            return Err(InferenceError::WorkerFailed(message));
        }
    }

    let response: RankingResponse = serde_json::from_value(value)
        .map_err(|e| InferenceError::InvalidFormat(e.to_string()))?;
    Ok(response.into_ranking())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DEFAULT_CANDIDATE_NAME, UserProfile};

    fn request() -> RecommendationRequest {
        RecommendationRequest::new("retirement income", "dev", UserProfile::default())
    }

    fn shell_ranker(script: &str) -> PrimaryRanker {
        PrimaryRanker::new(CommandSpec::shell(script)).with_timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn ranks_from_a_list_shaped_unit() {
        let ranker = shell_ranker(
            r#"echo '{"policies":[{"name":"Term Shield","why":"fits"},{"name":"Golden Years","why":"stable"}],"confidence":0.9,"method":"ml_v1"}'"#,
        );
        let ranking = ranker.rank(&request()).await.unwrap();
        assert_eq!(ranking.candidates.len(), 2);
        assert_eq!(ranking.candidates[1].name, "Golden Years");
        assert_eq!(ranking.confidence, Some(0.9));
    }

    #[tokio::test]
    async fn empty_output_is_reported_as_no_output() {
        let ranker = shell_ranker("exit 0");
        let err = ranker.rank(&request()).await.unwrap_err();
        assert!(matches!(err, InferenceError::NoOutput));
    }

    #[tokio::test]
    async fn nonzero_exit_carries_stderr_detail() {
        let ranker = shell_ranker("echo 'model file missing' >&2; exit 2");
        let err = ranker.rank(&request()).await.unwrap_err();
        match err {
            InferenceError::WorkerFailed(detail) => {
                assert!(
                    detail.contains("model file missing"),
                    "detail should carry stderr, got: {detail}"
                );
            }
            other => panic!("Expected WorkerFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn nonzero_exit_without_stderr_reports_the_code() {
        let ranker = shell_ranker("exit 7");
        let err = ranker.rank(&request()).await.unwrap_err();
        match err {
            InferenceError::WorkerFailed(detail) => {
                assert!(detail.contains('7'), "detail should name the code: {detail}");
            }
            other => panic!("Expected WorkerFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn garbage_output_is_invalid_format() {
        let ranker = shell_ranker("echo 'Traceback (most recent call last):'");
        let err = ranker.rank(&request()).await.unwrap_err();
        assert!(matches!(err, InferenceError::InvalidFormat(_)));
    }

    #[tokio::test]
    async fn in_band_error_fails_the_request() {
        let ranker = shell_ranker(r#"echo '{"error":"model not trained"}'"#);
        let err = ranker.rank(&request()).await.unwrap_err();
        match err {
            InferenceError::WorkerFailed(detail) => assert_eq!(detail, "model not trained"),
            other => panic!("Expected WorkerFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn slow_unit_times_out_and_fails_the_request() {
        let ranker = PrimaryRanker::new(CommandSpec::shell("sleep 30"))
            .with_timeout(Duration::from_millis(200));
        let err = ranker.rank(&request()).await.unwrap_err();
        match err {
            InferenceError::WorkerFailed(detail) => {
                assert!(detail.contains("timed out"), "got: {detail}")
            }
            other => panic!("Expected WorkerFailed, got {:?}", other),
        }
    }

    #[test]
    fn empty_json_object_is_one_opaque_candidate() {
        let ranking = parse_ranking("{}").unwrap();
        assert_eq!(ranking.candidates.len(), 1);
        assert_eq!(ranking.candidates[0].name, DEFAULT_CANDIDATE_NAME);
    }

    #[test]
    fn null_error_key_is_not_a_failure() {
        let ranking = parse_ranking(r#"{"name":"Term Shield","error":null}"#).unwrap();
        assert_eq!(ranking.candidates[0].name, "Term Shield");
    }

    #[test]
    fn non_string_error_report_is_stringified() {
        let err = parse_ranking(r#"{"error":{"kind":"oom"}}"#).unwrap_err();
        match err {
            InferenceError::WorkerFailed(detail) => assert!(detail.contains("oom")),
            other => panic!("Expected WorkerFailed, got {:?}", other),
        }
    }

    #[test]
    fn surrounding_whitespace_is_tolerated() {
        let ranking = parse_ranking("\n  {\"name\":\"Term Shield\"}  \n").unwrap();
        assert_eq!(ranking.candidates[0].name, "Term Shield");
    }
}
