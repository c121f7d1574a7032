// src/scrape/mod.rs
pub mod aggregate;
pub mod classify;
pub mod dedup;
pub mod discover;
pub mod extract;
pub mod fetch;
pub mod pipeline;
pub mod robots;
pub mod types;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use url::Url;

pub use aggregate::{build_summary, Aggregator, RunRequest};
pub use fetch::{FetchError, Fetcher, HttpFetcher, StaticFetcher};
pub use pipeline::SourcePipeline;
pub use types::{
    AggregateReport, Priority, Source, SourceResult, SourceStatus, SourceType, Summary,
    UpdateItem, UpdateType,
};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "scrape_sources_total",
            "Sources scraped, labelled by terminal status."
        );
        describe_counter!("scrape_updates_total", "Update items kept after dedupe.");
        describe_counter!(
            "scrape_fetch_errors_total",
            "Page fetches that failed (timeout, HTTP status, size, network)."
        );
        describe_histogram!("scrape_source_ms", "Wall time per source in milliseconds.");
        describe_gauge!("scrape_last_run_ts", "Unix ts when a batch last finished.");
    });
}

/// `scheme://host[:port]` of `url`, or `None` for anything without a tuple origin.
pub fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let origin = parsed.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}
