//! Command-line consumer of `/api/updates` with a 24h on-disk cache.
//!
//! Fresh cache is served without a request; `--refresh` drops it first. When
//! the request fails the last cached report is used, however old. Each
//! `--category` gets its own cache entry.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::Parser;
use updates_tracker::cache::{CachedReport, ReportCache, ServedFrom, DEFAULT_TTL};
use updates_tracker::scrape::types::{AggregateReport, SourceStatus};

#[derive(Parser, Debug)]
#[command(name = "updates_client")]
#[command(about = "Show the latest SaaS updates, cached for 24 hours")]
struct Args {
    /// Base URL of the service
    #[arg(long, env = "UPDATES_API_URL", default_value = "http://127.0.0.1:8000")]
    api_url: String,

    /// Directory holding the cache file
    #[arg(long, env = "UPDATES_CACHE_DIR", default_value = ".cache")]
    cache_dir: PathBuf,

    /// Ignore and replace the cached report
    #[arg(long)]
    refresh: bool,

    /// Only this category (passed through to the service)
    #[arg(long)]
    category: Option<String>,

    /// Print the raw report JSON instead of a listing
    #[arg(long)]
    json: bool,
}

async fn fetch_report(api_url: &str, category: Option<&str>) -> anyhow::Result<AggregateReport> {
    let url = format!("{}/api/updates", api_url.trim_end_matches('/'));
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .context("building reqwest client")?;
    let mut req = client.get(&url);
    if let Some(c) = category {
        req = req.query(&[("category", c)]);
    }
    let resp = req.send().await.with_context(|| format!("GET {url}"))?;
    let status = resp.status();
    if !status.is_success() {
        bail!("GET {url} returned {status}");
    }
    resp.json::<AggregateReport>()
        .await
        .context("decoding report JSON")
}

fn print_listing(entry: &CachedReport, from_cache: bool) {
    let report = &entry.data;
    let age_min = entry.age(Utc::now()).as_secs() / 60;
    println!(
        "Fetched {} ({}; {} min old)",
        report.fetched_at.format("%Y-%m-%d %H:%M UTC"),
        if from_cache { "cached" } else { "live" },
        age_min
    );
    println!(
        "{} products, {} with updates, {} updates total",
        report.summary.total_products,
        report.summary.products_with_updates,
        report.summary.total_updates
    );
    if let Some(w) = &report.warning {
        println!("warning: {w}");
    }
    for p in &report.products {
        println!();
        match p.status {
            SourceStatus::Ok => println!("== {} [{}]", p.name, p.category),
            other => println!(
                "== {} [{}] {}{}",
                p.name,
                p.category,
                other.as_str(),
                p.error_message
                    .as_deref()
                    .map(|m| format!(": {m}"))
                    .unwrap_or_default()
            ),
        }
        for u in &p.updates {
            println!(
                "  {} {:<14} {:?}  {}",
                u.date,
                u.kind.label(),
                u.priority,
                u.title
            );
            println!("      {}", u.link);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    updates_tracker::init_tracing();
    let args = Args::parse();

    let category = args.category.as_deref();
    let cache = ReportCache::for_category(&args.cache_dir, DEFAULT_TTL, category);
    let served = cache
        .read_through(args.refresh, || fetch_report(&args.api_url, category))
        .await?;
    output(&served.entry, served.from != ServedFrom::Network, args.json)
}

fn output(entry: &CachedReport, from_cache: bool, json: bool) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&entry.data).context("serializing report")?
        );
    } else {
        print_listing(entry, from_cache);
    }
    Ok(())
}
