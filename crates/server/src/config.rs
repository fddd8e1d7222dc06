//! Orchestrator configuration

use std::path::PathBuf;
use std::time::Duration;

use worker::CommandSpec;

/// Everything the orchestrator needs to know about its computation
/// units. Constructed with [`Default`] and adjusted through the `with_*`
/// builders; binaries surface these as command-line flags.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Unit producing the ranked candidate list
    pub ranker_command: CommandSpec,
    /// Unit producing one trust score per candidate
    pub scorer_command: CommandSpec,
    /// Directory both units run from, when it must differ from ours
    pub working_dir: Option<PathBuf>,
    /// Hard cap on the single ranking invocation
    pub ranker_timeout: Duration,
    /// Hard cap on each scoring invocation
    pub scorer_timeout: Duration,
    /// Ceiling on simultaneously running scoring units
    pub max_concurrent_scorers: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            ranker_command: CommandSpec::new("python3").arg("scripts/rank_policies.py"),
            scorer_command: CommandSpec::new("python3").arg("scripts/score_trust.py"),
            working_dir: None,
            ranker_timeout: inference::DEFAULT_RANKING_TIMEOUT,
            scorer_timeout: scoring::DEFAULT_SCORING_TIMEOUT,
            max_concurrent_scorers: scoring::DEFAULT_MAX_CONCURRENT,
        }
    }
}

impl OrchestratorConfig {
    pub fn with_ranker_command(mut self, command: CommandSpec) -> Self {
        self.ranker_command = command;
        self
    }

    pub fn with_scorer_command(mut self, command: CommandSpec) -> Self {
        self.scorer_command = command;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_ranker_timeout(mut self, timeout: Duration) -> Self {
        self.ranker_timeout = timeout;
        self
    }

    pub fn with_scorer_timeout(mut self, timeout: Duration) -> Self {
        self.scorer_timeout = timeout;
        self
    }

    pub fn with_max_concurrent_scorers(mut self, max: usize) -> Self {
        self.max_concurrent_scorers = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_python_units() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.ranker_command.program, "python3");
        assert_eq!(config.ranker_timeout, Duration::from_secs(60));
        assert_eq!(config.scorer_timeout, Duration::from_secs(30));
        assert_eq!(config.max_concurrent_scorers, 8);
    }

    #[test]
    fn builders_override_the_defaults() {
        let config = OrchestratorConfig::default()
            .with_scorer_timeout(Duration::from_secs(5))
            .with_max_concurrent_scorers(2)
            .with_working_dir("/srv/trust-recs");
        assert_eq!(config.scorer_timeout, Duration::from_secs(5));
        assert_eq!(config.max_concurrent_scorers, 2);
        assert_eq!(
            config.working_dir.as_deref(),
            Some(std::path::Path::new("/srv/trust-recs"))
        );
    }
}
