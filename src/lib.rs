// src/lib.rs
// Public library surface for the service binary, the CLI bins and integration tests.

pub mod api;
pub mod cache;
pub mod config;
pub mod metrics;
pub mod scrape;

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub use crate::api::router;
pub use crate::config::ScraperConfig;
pub use crate::scrape::{AggregateReport, Aggregator, HttpFetcher, RunRequest, Source};

/// Compact tracing to stderr. `try_init` so a subscriber installed by the
/// host runtime (or another test) wins.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("scrape=info,api=info,warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init();
}

/// Aggregator over the configured sources with the real HTTP fetcher.
pub fn build_aggregator(cfg: ScraperConfig, sources: Vec<Source>) -> anyhow::Result<Aggregator> {
    let fetcher = HttpFetcher::new(&cfg.user_agent).context("creating HTTP fetcher")?;
    Ok(Aggregator::new(cfg, sources, Arc::new(fetcher)))
}

/// Full application: API routes plus `/metrics`, built from config on disk.
pub async fn app() -> anyhow::Result<Router> {
    let cfg = ScraperConfig::load_default().context("loading scraper config")?;
    let sources = config::load_sources_default().context("loading sources")?;
    tracing::info!(sources = sources.len(), "configuration loaded");

    let metrics = crate::metrics::Metrics::init(&cfg)?;
    let aggregator = build_aggregator(cfg, sources)?;
    Ok(router(api::AppState::new(aggregator)).merge(metrics.router()))
}
