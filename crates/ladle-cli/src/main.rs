mod build_info;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use ladle_client::{RecipeDetailParser, RecipeListingParser, ReqwestFetcher};
use ladle_core::output::write_results;
use ladle_core::throttle::{ThrottleConfig, ThrottledFetcher};
use ladle_core::{FailurePolicy, Pipeline, PipelineConfig};

use crate::build_info::BuildInfo;

const DEFAULT_SEED: &str = "https://www.allrecipes.com/recipes/16369/soups-stews-and-chili/soup/";

#[derive(Parser)]
#[command(name = "ladle", version, about = "Concurrent recipe extraction pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover recipes from a listing page, extract them and write JSON
    Run(RunArgs),

    /// Show build information
    Version {
        /// Print as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Listing page to discover recipes from
    #[arg(short, long, env = "LADLE_SEED", default_value = DEFAULT_SEED)]
    seed: String,

    /// Where to write the JSON result set
    #[arg(short, long, env = "LADLE_OUTPUT", default_value = "data.json")]
    output: PathBuf,

    /// Maximum number of recipes extracted concurrently
    #[arg(short = 'w', long, env = "LADLE_MAX_WORKERS", default_value_t = 10)]
    max_workers: usize,

    /// Discovered recipes allowed to wait; extra ones are dropped
    #[arg(short, long, env = "LADLE_QUEUE_CAPACITY", default_value_t = 100)]
    queue_capacity: usize,

    /// Per-recipe time limit in seconds (0 disables it)
    #[arg(long, env = "LADLE_ITEM_TIMEOUT", default_value_t = 30)]
    item_timeout: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "LADLE_HTTP_TIMEOUT", default_value_t = 30)]
    http_timeout: u64,

    /// Minimum delay between requests to the same domain, in milliseconds
    #[arg(long, env = "LADLE_DELAY_MS", default_value_t = 100)]
    delay_ms: u64,

    /// Random extra delay per request, in milliseconds
    #[arg(long, env = "LADLE_JITTER_MS", default_value_t = 0)]
    jitter_ms: u64,

    /// Write failed recipes with empty ingredient and step lists
    #[arg(long, default_value_t = false)]
    include_failed: bool,

    /// Count pages without ingredients or steps as failures
    #[arg(long, default_value_t = false)]
    require_content: bool,
}

impl RunArgs {
    fn pipeline_config(&self) -> PipelineConfig {
        let item_timeout = (self.item_timeout > 0).then(|| Duration::from_secs(self.item_timeout));
        let policy = if self.include_failed {
            FailurePolicy::IncludeEmpty
        } else {
            FailurePolicy::Exclude
        };
        PipelineConfig::default()
            .with_max_workers(self.max_workers)
            .with_queue_capacity(self.queue_capacity)
            .with_item_timeout(item_timeout)
            .with_failure_policy(policy)
    }

    fn throttle_config(&self) -> ThrottleConfig {
        ThrottleConfig::new(Duration::from_millis(self.delay_ms))
            .with_jitter(Duration::from_millis(self.jitter_ms))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("ladle=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => cmd_run(args).await,
        Commands::Version { json } => cmd_version(json),
    }
}

fn cmd_version(json: bool) -> Result<()> {
    let info = BuildInfo::current();
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("{info}");
    }
    Ok(())
}

async fn cmd_run(args: RunArgs) -> Result<()> {
    let build = BuildInfo::current();
    tracing::info!(
        version = build.version,
        commit = build.git_commit,
        built = build.build_time,
        "Starting ladle"
    );

    let config = args.pipeline_config();
    let policy = config.failure_policy;

    let http = ReqwestFetcher::with_timeout(Duration::from_secs(args.http_timeout))
        .context("Failed to create HTTP client")?;
    let fetcher = ThrottledFetcher::new(http, args.throttle_config());
    let listing = RecipeListingParser::new().context("Invalid listing selectors")?;
    let parser = RecipeDetailParser::new()
        .context("Invalid recipe selectors")?
        .require_content(args.require_content);

    let cancel = CancellationToken::new();
    let pipeline = Pipeline::new(fetcher, listing, parser, config)
        .context("Invalid pipeline configuration")?
        .with_cancellation(cancel.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing recipes already in progress");
            cancel.cancel();
        }
    });

    let report = pipeline
        .run(&args.seed)
        .await
        .with_context(|| format!("Pipeline failed for {}", args.seed))?;

    let written = write_results(&args.output, &report.results, policy)
        .with_context(|| format!("Failed to save results to {}", args.output.display()))?;

    let stats = &report.stats;
    tracing::info!(
        run_id = %report.run_id,
        elapsed_ms = report.elapsed.as_millis() as u64,
        requests = stats.requests,
        requests_per_sec = stats.requests_per_second(),
        discovered = stats.discovered,
        dropped = stats.dropped,
        completed = stats.completed,
        failed = stats.failed,
        peak_workers = stats.peak_in_flight,
        written,
        output = %args.output.display(),
        "Run complete"
    );
    for (kind, count) in &stats.failures_by_kind {
        tracing::info!(kind = *kind, count = *count, "Failures by kind");
    }

    Ok(())
}
