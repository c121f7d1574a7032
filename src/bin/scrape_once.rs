//! Run one scraping batch against the configured sources and print the report.
//!
//! ```bash
//! cargo run --bin scrape_once -- --category "Finance" --debug
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use updates_tracker::config::{load_sources_default, load_sources_from};
use updates_tracker::{build_aggregator, init_tracing, RunRequest, ScraperConfig};

#[derive(Parser, Debug)]
#[command(name = "scrape_once")]
#[command(about = "Scrape all configured sources once and print the JSON report")]
struct Args {
    /// Scraper config file (default: $SCRAPER_CONFIG_PATH, then config/scraper.{toml,json})
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sources file (default: $SOURCES_CONFIG_PATH, then config/sources.{toml,json})
    #[arg(long)]
    sources: Option<PathBuf>,

    /// Only scrape sources of this category
    #[arg(long)]
    category: Option<String>,

    /// Attach per-source debug info
    #[arg(long)]
    debug: bool,

    /// Pretty-print the JSON
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();
    let args = Args::parse();

    let cfg = match &args.config {
        Some(p) => ScraperConfig::load_from(p)?,
        None => ScraperConfig::load_default()?,
    };
    let sources = match &args.sources {
        Some(p) => load_sources_from(p)?,
        None => load_sources_default()?,
    };

    let aggregator = build_aggregator(cfg, sources)?;
    let report = aggregator
        .run_with(&RunRequest {
            category: args.category,
            debug: args.debug,
        })
        .await;

    let json = if args.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .context("serializing report")?;
    println!("{json}");
    Ok(())
}
