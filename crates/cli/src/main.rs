use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use aggregate::AggregatedResponse;
use catalog::PolicyCatalog;
use inference::{RecommendationRequest, UserProfile};
use scoring::ItemScoreResult;
use server::{OrchestratorConfig, RecommendationOrchestrator};
use worker::CommandSpec;

/// TrustRecs - Policy Recommendation Backend
#[derive(Parser)]
#[command(name = "trust-recs")]
#[command(about = "Policy recommendations with per-policy trust verification", long_about = None)]
struct Cli {
    /// Path to the policy catalog CSV
    #[arg(long, default_value = "data/policies.csv")]
    catalog: PathBuf,

    /// Command line of the ranking unit
    #[arg(long, default_value = "python3 scripts/rank_policies.py")]
    ranker_cmd: String,

    /// Command line of the trust scoring unit
    #[arg(long, default_value = "python3 scripts/score_trust.py")]
    scorer_cmd: String,

    /// Working directory the computation units run from
    #[arg(long)]
    workdir: Option<PathBuf>,

    /// Per-policy scoring timeout in seconds
    #[arg(long, default_value = "30")]
    scorer_timeout: u64,

    /// Ceiling on simultaneously running scoring units
    #[arg(long, default_value = "8")]
    max_concurrent: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get trust-verified policy recommendations for a customer
    Recommend {
        /// What the customer is looking for
        #[arg(long)]
        description: String,

        /// Customer the profile belongs to
        #[arg(long)]
        username: String,

        /// Path to a JSON profile file (defaults apply when omitted)
        #[arg(long)]
        profile: Option<PathBuf>,

        /// Show interpretation and score breakdown for each policy
        #[arg(long)]
        explain: bool,
    },

    /// Trust-score a single policy for a customer
    Score {
        /// Policy name to score
        #[arg(long)]
        policy: String,

        /// Customer the profile belongs to
        #[arg(long)]
        username: String,

        /// Path to a JSON profile file (defaults apply when omitted)
        #[arg(long)]
        profile: Option<PathBuf>,
    },

    /// Inspect the policy catalog
    Catalog {
        /// Look up one policy by name (exact first, then substring)
        #[arg(long)]
        find: Option<String>,
    },

    /// Run benchmark to test end-to-end performance
    Benchmark {
        /// Number of requests to make
        #[arg(long, default_value = "100")]
        requests: usize,

        /// Number of concurrent requests
        #[arg(long, default_value = "10")]
        concurrent: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Load the catalog (shared by every command)
    println!("Loading policy catalog from {}...", cli.catalog.display());
    let start = Instant::now();
    let catalog = Arc::new(
        PolicyCatalog::load_from_csv(&cli.catalog).context("Failed to load policy catalog")?,
    );
    println!(
        "{} Loaded {} policies in {:?}",
        "✓".green(),
        catalog.len(),
        start.elapsed()
    );

    let orchestrator = build_orchestrator(&cli, catalog.clone())?;

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Recommend {
            description,
            username,
            profile,
            explain,
        } => handle_recommend(orchestrator, description, username, profile, explain).await?,
        Commands::Score {
            policy,
            username,
            profile,
        } => handle_score(orchestrator, policy, username, profile).await?,
        Commands::Catalog { find } => handle_catalog(&catalog, find)?,
        Commands::Benchmark {
            requests,
            concurrent,
        } => handle_benchmark(orchestrator, requests, concurrent).await?,
    }

    Ok(())
}

/// Split a flag like "python3 scripts/rank_policies.py" into a unit spec
fn parse_command(raw: &str) -> Result<CommandSpec> {
    let mut parts = raw.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| anyhow!("empty command line: {raw:?}"))?;
    let mut spec = CommandSpec::new(program);
    for arg in parts {
        spec = spec.arg(arg);
    }
    Ok(spec)
}

fn build_orchestrator(cli: &Cli, catalog: Arc<PolicyCatalog>) -> Result<RecommendationOrchestrator> {
    let mut config = OrchestratorConfig::default()
        .with_ranker_command(parse_command(&cli.ranker_cmd)?)
        .with_scorer_command(parse_command(&cli.scorer_cmd)?)
        .with_scorer_timeout(Duration::from_secs(cli.scorer_timeout))
        .with_max_concurrent_scorers(cli.max_concurrent);
    if let Some(dir) = &cli.workdir {
        config = config.with_working_dir(dir);
    }
    Ok(RecommendationOrchestrator::new(config, catalog))
}

/// Read a profile file, or fall back to the default attributes
fn load_profile(path: Option<PathBuf>) -> Result<UserProfile> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read profile file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse profile file {}", path.display()))
        }
        None => Ok(UserProfile::default()),
    }
}

/// Handle the 'recommend' command
async fn handle_recommend(
    orchestrator: RecommendationOrchestrator,
    description: String,
    username: String,
    profile: Option<PathBuf>,
    explain: bool,
) -> Result<()> {
    let profile = load_profile(profile)?;
    let request = RecommendationRequest::new(description, username, profile);

    let response = orchestrator.recommend(request).await?;
    print_policies(&response, explain);
    Ok(())
}

/// Handle the 'score' command
async fn handle_score(
    orchestrator: RecommendationOrchestrator,
    policy: String,
    username: String,
    profile: Option<PathBuf>,
) -> Result<()> {
    let profile = load_profile(profile)?;
    let request = RecommendationRequest::new(String::new(), username, profile);

    let result = orchestrator.score_one(&policy, &request).await?;
    print_score(&policy, &result);
    Ok(())
}

/// Handle the 'catalog' command
fn handle_catalog(catalog: &PolicyCatalog, find: Option<String>) -> Result<()> {
    match find {
        Some(name) => match catalog.find(&name) {
            Some(record) => {
                let metadata = record.metadata();
                println!("{}", record.name.bold().blue());
                println!("{}Type: {}", "• ".green(), metadata.policy_type);
                println!(
                    "{}Transparency: {:.2}  Suitability: {:.2}  Safety: {:.2}  Compliance: {:.2}",
                    "• ".green(),
                    metadata.transparency_score,
                    metadata.suitability_score,
                    metadata.financial_safety_score,
                    metadata.compliance_score
                );
                if let Some(description) = catalog.description(&record.name) {
                    println!("{}{}", "• ".cyan(), description);
                }
            }
            None => println!("{} No policy matching '{}'", "✗".red(), name),
        },
        None => {
            println!("{}", "Policy catalog:".bold().blue());
            for record in catalog.records() {
                let metadata = record.metadata();
                println!(
                    "  {} [{}] transparency {:.2}, suitability {:.2}, safety {:.2}, compliance {:.2}",
                    record.name,
                    metadata.policy_type,
                    metadata.transparency_score,
                    metadata.suitability_score,
                    metadata.financial_safety_score,
                    metadata.compliance_score
                );
            }
        }
    }
    Ok(())
}

/// Handle the 'benchmark' command
async fn handle_benchmark(
    orchestrator: RecommendationOrchestrator,
    requests: usize,
    concurrent: usize,
) -> Result<()> {
    // Synthesize distinct customers so each request exercises the full
    // flow with a slightly different payload
    let bench_requests: Vec<RecommendationRequest> = (0..requests)
        .map(|i| {
            let mut profile = UserProfile::default();
            profile.age = rand::random::<u32>() % 50 + 21;
            profile.balance = (rand::random::<u32>() % 500_000) as f64;
            RecommendationRequest::new(
                "benchmark request for a balanced portfolio",
                format!("bench_user_{i}"),
                profile,
            )
        })
        .collect();

    let limiter = Arc::new(tokio::sync::Semaphore::new(concurrent.max(1)));
    let bench_start = Instant::now();

    // Spawn concurrent requests, bounded by the limiter
    let mut handles = vec![];
    for request in bench_requests {
        let orchestrator = orchestrator.clone();
        let permit = limiter.clone().acquire_owned().await.ok();
        let handle = tokio::spawn(async move {
            let _permit = permit;
            let start = Instant::now();
            orchestrator.recommend(request).await?;
            Ok::<_, anyhow::Error>(start.elapsed())
        });
        handles.push(handle);
    }
    // Wait for all tasks to complete and collect timings
    let mut timings = vec![];
    for handle in handles {
        let elapsed = handle.await??;
        timings.push(elapsed);
    }

    let wall_time = bench_start.elapsed();
    let total_time: Duration = timings.iter().sum();
    let avg_latency = total_time / (timings.len() as u32);
    timings.sort();
    let p50 = timings[timings.len() / 2];
    let p95 = timings[(timings.len() as f32 * 0.95) as usize];
    let p99 = timings[(timings.len() as f32 * 0.99) as usize];
    let throughput = requests as f32 / wall_time.as_secs_f32();

    println!("Benchmark results:");
    println!("Total time: {:?}", wall_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", p50);
    println!("P95 latency: {:?}", p95);
    println!("P99 latency: {:?}", p99);
    println!("Throughput: {:.2} requests/second", throughput);

    Ok(())
}

/// Helper function to format and print a recommendation envelope
fn print_policies(response: &AggregatedResponse, explain: bool) {
    println!("{}", "Policy Recommendations:".bold().blue());
    for (rank, policy) in response.policies.iter().enumerate() {
        println!(
            "{}. {} [{}] - Trust: {:.2} ({})",
            (rank + 1).to_string().green(),
            policy.name,
            policy.policy_type,
            policy.trust_score,
            policy.trust_confidence
        );
        println!("   {}", policy.why);
        if let Some(error) = &policy.trust_error {
            println!("   {} {}", "! degraded:".yellow(), error);
        }
        if explain {
            println!(
                "   {}: {} - {}",
                policy.trust_interpretation.level,
                policy.trust_interpretation.description,
                policy.trust_interpretation.recommendation
            );
            let scores = &policy.enhanced_scores;
            println!(
                "   Baselines: transparency {:.2}, suitability {:.2}, safety {:.2}, compliance {:.2}",
                scores.transparency_score,
                scores.suitability_score,
                scores.financial_safety_score,
                scores.compliance_score
            );
        }
    }
    println!(
        "Method: {}, confidence: {}, verified at {}",
        response.method.as_deref().unwrap_or("n/a"),
        response
            .confidence
            .map(|c| format!("{c:.2}"))
            .unwrap_or_else(|| "n/a".to_string()),
        response.trust_verification_timestamp
    );
}

/// Helper function to print a single trust score
fn print_score(policy: &str, result: &ItemScoreResult) {
    println!("{}", format!("Trust score for {policy}:").bold().blue());
    println!(
        "{}Score: {:.2} ({})",
        "• ".green(),
        result.trust_score,
        result.confidence
    );
    println!(
        "{}{}: {}",
        "• ".green(),
        result.interpretation.level,
        result.interpretation.description
    );
    println!(
        "{}Recommendation: {}",
        "• ".green(),
        result.interpretation.recommendation
    );
    if let Some(components) = &result.component_scores {
        println!("{}Components: {}", "• ".cyan(), components);
    }
    if let Some(error) = &result.error {
        println!("{} {}", "! degraded:".yellow(), error);
    }
}
