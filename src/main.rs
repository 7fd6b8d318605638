//! Newsdesk binary entrypoint.
//! `harvest` turns local RSS or Atom files into NDJSON records; `build` turns records
//! into the sectioned JSON document.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use newsdesk::ingest::providers::ndjson::NdjsonFileSource;
use newsdesk::ingest::types::RecordSource;
use newsdesk::ingest::{self, collect, feed_sources};
use newsdesk::{load_default, Pipeline};

#[derive(Debug, Parser)]
#[command(name = "newsdesk", version, about = "Sectioned news page builder")]
struct Cli {
    /// Configuration file (TOML or JSON); falls back to $NEWSDESK_CONFIG_PATH, then config/.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Classify, cap and assemble records into the page document.
    Build {
        #[arg(long, default_value = "scraper_out.ndjson")]
        input: PathBuf,
        #[arg(long, default_value = "news.json")]
        output: PathBuf,
    },
    /// Read the configured local RSS or Atom feeds and write NDJSON records.
    Harvest {
        #[arg(long, default_value = "scraper_out.ndjson")]
        output: PathBuf,
    },
}

const DEFAULT_LOG_FILTER: &str = "newsdesk=info,pipeline=info,ingest=info,config=info,warn";

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

async fn build(pipeline: &Pipeline, input: PathBuf, output: PathBuf) -> Result<()> {
    let sources: Vec<Box<dyn RecordSource>> = vec![Box::new(NdjsonFileSource::new(&input))];
    let (records, malformed) = collect(&sources).await;

    let (doc, stats) = pipeline.run(records, malformed);
    let json = doc.to_json_pretty().context("serializing document")?;
    tokio::fs::write(&output, json)
        .await
        .with_context(|| format!("writing {}", output.display()))?;

    tracing::info!(output = %output.display(), emitted = stats.emitted, "wrote document");
    Ok(())
}

async fn harvest(pipeline: &Pipeline, output: PathBuf) -> Result<()> {
    let cfg = pipeline.config();
    let sources = feed_sources(&cfg.feeds, cfg.feed_item_limit);
    let (body, written, duplicates) =
        ingest::harvest(&sources, cfg.harvest_limit, Utc::now()).await?;

    tokio::fs::write(&output, body)
        .await
        .with_context(|| format!("writing {}", output.display()))?;

    tracing::info!(output = %output.display(), written, duplicates, "wrote records");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let cfg = load_default(cli.config.as_deref()).context("loading configuration")?;
    let pipeline = Pipeline::new(cfg).context("invalid configuration")?;

    match cli.command {
        Command::Build { input, output } => build(&pipeline, input, output).await,
        Command::Harvest { output } => harvest(&pipeline, output).await,
    }
}
