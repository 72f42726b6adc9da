//! # TrafficWise Evaluation Runner
//!
//! Runs one evaluation against an in-memory store seeded from a JSON dataset, using the
//! stub collaborators, and prints the run report as JSON.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::info;
use trafficwise_core::collaborators::Collaborators;
use trafficwise_core::config::ConfigManager;
use trafficwise_core::logging::init_structured_logging;
use trafficwise_core::seed::{provision, Dataset};
use trafficwise_core::service::EvaluationService;
use trafficwise_core::store::InMemoryStore;

#[derive(Parser)]
#[command(name = "trafficwise-evaluate")]
#[command(about = "Run one traffic and air-quality evaluation")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// TOML configuration file layered over the built-in defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON dataset used to seed the in-memory store
    #[arg(short, long)]
    dataset: Option<PathBuf>,

    /// Evaluation timestamp (POSIX seconds); defaults to now
    #[arg(short, long, allow_negative_numbers = true)]
    predict_for: Option<i64>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(success) => process::exit(if success { 0 } else { 1 }),
        Err(e) => {
            eprintln!("❌ {e:#}");
            process::exit(2);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let manager = ConfigManager::load(cli.config.as_deref()).context("failed to load configuration")?;
    let mut config = manager.config().clone();
    match cli.verbose {
        0 => {}
        1 => config.logging.level = "debug".to_string(),
        _ => config.logging.level = "trace".to_string(),
    }
    init_structured_logging(&config.logging);
    info!(environment = manager.environment(), "📋 Configuration loaded");

    let store = Arc::new(InMemoryStore::new(config.store.page_size));
    if let Some(path) = &cli.dataset {
        let dataset = Dataset::from_path(path)?;
        provision(store.as_ref(), &dataset)
            .await
            .with_context(|| format!("failed to provision {}", path.display()))?;
    }

    let service = EvaluationService::new(store, Collaborators::stubs(), &config)?;
    let report = service.evaluate(cli.predict_for).await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report.is_success())
}
