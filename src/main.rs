// Command-line front end for the research harvester.
//
// One-shot subcommands print a single JSON response on stdout; `serve` reads
// newline-delimited JSON requests from stdin and answers each on its own line
// as it completes.
// Logs go to stderr.

use anyhow::Result;
use clap::{Parser, Subcommand};
use research_harvest::{
    BrowserManager, Config, ResearchOrchestrator, ResearchRequest, ResearchResponse,
    ResearchService, load_config_from, load_yaml_config,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML config file (overrides $RESEARCH_HARVEST_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover pages for a query and extract their text
    Search {
        #[arg(required = true)]
        query: Vec<String>,

        /// Maximum number of pages to harvest
        #[arg(short, long)]
        pages: Option<usize>,
    },

    /// Discover candidate URLs only
    Discover {
        #[arg(required = true)]
        query: Vec<String>,

        #[arg(short, long)]
        pages: Option<usize>,
    },

    /// Extract text from the given URLs
    Extract {
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Answer newline-delimited JSON requests on stdin
    Serve,
}

fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn print_response(response: &ResearchResponse) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(())
}

async fn serve(service: &ResearchService, config: &Config) -> Result<()> {
    let store = service.orchestrator().store().clone();
    store
        .spawn_sweeper(Duration::from_secs(config.research.sweep_interval_secs))
        .await;

    info!("Serving requests on stdin");
    let served = service
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await;

    info!("stdin closed, stopping");
    store.shutdown().await;
    served?;
    Ok(())
}

async fn run(cli: Cli, service: &ResearchService, config: &Config) -> Result<()> {
    match cli.command {
        Commands::Search { query, pages } => {
            let response = service
                .handle(ResearchRequest::SearchAndExtract {
                    query: query.join(" "),
                    request_id: new_request_id(),
                    page_budget: pages,
                })
                .await;
            print_response(&response)
        }
        Commands::Discover { query, pages } => {
            let response = service
                .handle(ResearchRequest::SearchOnly {
                    query: query.join(" "),
                    request_id: new_request_id(),
                    page_budget: pages,
                })
                .await;
            print_response(&response)
        }
        Commands::Extract { urls } => {
            let response = service
                .handle(ResearchRequest::ExtractUrls {
                    urls,
                    request_id: new_request_id(),
                })
                .await;
            print_response(&response)
        }
        Commands::Serve => serve(service, config).await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_yaml_config()?,
    };

    info!("Starting research-harvest v{}", env!("CARGO_PKG_VERSION"));

    let manager = Arc::new(BrowserManager::new(config.browser.clone()));
    let orchestrator = Arc::new(ResearchOrchestrator::with_chrome(&config, manager.clone())?);
    let service = ResearchService::new(orchestrator, config.research.page_budget);

    let outcome = run(cli, &service, &config).await;

    if let Err(e) = manager.shutdown().await {
        error!("Browser shutdown failed: {}", e);
    }

    if let Err(e) = &outcome {
        error!("Command failed: {}", e);
    }
    outcome
}
