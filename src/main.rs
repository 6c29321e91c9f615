//! claimcheck CLI - Verify a claim against live web search.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use claimcheck::client::HealthStatus;
use claimcheck::{AgentResult, Config, FactCheckAgent, LlmClient, Reporter, SerpClient};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

const DEFAULT_CLAIM: &str = "The Great Wall of China is visible from space with the naked eye";

#[derive(Parser)]
#[command(name = "claimcheck")]
#[command(author = "Infernet <dev@infernet.org>")]
#[command(version)]
#[command(about = "Claim verification via plan-and-execute web search and LLM reasoning")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Claim to verify
    claim: Option<String>,

    /// Path to configuration file (defaults are used when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print the full result as JSON instead of the report
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration and report which credentials resolve
    Validate {
        /// Also health-check the LLM endpoint
        #[arg(long)]
        ping: bool,
    },

    /// Show example configuration
    Example,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
}

fn print_example_config() {
    let example = r#"# claimcheck configuration file

[llm]
# API key (can also use the variable named by api_key_env)
# api_key = "${OPENAI_API_KEY}"
api_key_env = "OPENAI_API_KEY"
base_url = "https://api.openai.com/v1"
model = "gpt-4o-mini"
planner_temperature = 0.3
reasoner_temperature = 0.2
max_tokens = 1024
timeout_secs = 60
max_retries = 2

[search]
base_url = "https://www.google.com/search"
use_proxy = true
proxy_host = "brd.superproxy.io"
proxy_port = 33335
# Falls back to BRIGHTDATA_CUSTOMER_ID / BRIGHTDATA_ZONE / BRIGHTDATA_PASSWORD
# customer_id = "${BRIGHTDATA_CUSTOMER_ID}"
# zone = "serp_api1"
# password = "${BRIGHTDATA_PASSWORD}"
accept_invalid_certs = false
timeout_secs = 30
language = "en"
# country = "us"
# num_results = 10

[agent]
max_sub_queries = 3
"#;
    println!("{example}");
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {path:?}")),
        None => Ok(Config::default()),
    }
}

async fn validate(config: &Config, ping: bool) -> Result<()> {
    let api_key = config.resolve_llm_api_key();
    let proxy = config.resolve_proxy_credentials();

    info!("Configuration is valid");
    info!("  Model: {} at {}", config.llm.model, config.llm.base_url);
    info!(
        "  LLM credential: {}",
        if api_key.is_some() { "resolved" } else { "missing" }
    );
    if config.search.use_proxy {
        info!(
            "  Search proxy: {}:{} ({})",
            config.search.proxy_host,
            config.search.proxy_port,
            if proxy.is_some() { "credentials resolved" } else { "credentials missing" }
        );
    } else {
        info!("  Search proxy: disabled");
    }
    info!("  Max sub-queries: {}", config.agent.max_sub_queries);

    if ping {
        let client = LlmClient::new(&config.llm, api_key)?;
        let health = client.health_check().await;
        match health.status {
            HealthStatus::Healthy => info!(
                "  LLM endpoint: {} ({}ms)",
                health.status,
                health.latency_ms.unwrap_or_default()
            ),
            _ => warn!(
                "  LLM endpoint: {} ({})",
                health.status,
                health.error.as_deref().unwrap_or("no detail")
            ),
        }
    }

    Ok(())
}

fn spinner(claim: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} [{elapsed_precise}] {msg}")
            .context("Invalid spinner template")?,
    );
    pb.set_message(format!("Checking: {claim}"));
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Some(Commands::Example) => {
            print_example_config();
            return Ok(());
        }

        Some(Commands::Validate { ping }) => {
            let config = load_config(cli.config.as_deref())?;
            return validate(&config, ping).await;
        }

        None => {}
    }

    let config = load_config(cli.config.as_deref())?;
    let claim = cli.claim.unwrap_or_else(|| DEFAULT_CLAIM.to_string());

    let model = Arc::new(LlmClient::new(&config.llm, config.resolve_llm_api_key())?);
    let search = Arc::new(SerpClient::from_config(&config).context("Failed to build search client")?);
    let reporter = if cli.json {
        Reporter::silent()
    } else {
        Reporter::stdout()
    };

    let agent = FactCheckAgent::builder(model, search)
        .config(&config)
        .reporter(reporter)
        .build();

    let pb = if cli.json { None } else { Some(spinner(&claim)?) };
    let result = agent.check(&claim).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialize result")?;
        println!("{json}");
    }

    match &result {
        AgentResult::Completed(run) => {
            info!(
                run_id = %run.run_id,
                "Completed in {:.1}s",
                run.execution_time_ms as f64 / 1000.0
            );
            Ok(())
        }
        AgentResult::Failed(run) => {
            if !cli.json {
                eprintln!("Fact check failed: {}", run.error);
            }
            std::process::exit(1);
        }
    }
}
