// tests/aggregate_report.rs
//
// Batch behaviour: summary math, time budget, politeness delay, JSON shape.

use std::sync::Arc;
use std::time::{Duration, Instant};

use updates_tracker::config::ScraperConfig;
use updates_tracker::scrape::aggregate::{Aggregator, RunRequest};
use updates_tracker::scrape::fetch::StaticFetcher;
use updates_tracker::scrape::types::{AggregateReport, Source, SourceStatus};

fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("read {path}: {e}"))
}

fn quiet_cfg() -> ScraperConfig {
    ScraperConfig {
        respect_robots: false,
        request_delay_ms: 0,
        ..ScraperConfig::default()
    }
}

fn sources() -> Vec<Source> {
    vec![
        Source::new("Acme CRM", "https://www.acme.example/crm/")
            .with_updates_url("https://www.acme.example/crm/release-notes/")
            .with_category("CRM & Sales"),
        Source::new("Acme News", "https://www.acme.example/")
            .with_updates_url("https://www.acme.example/news/")
            .with_category("News"),
        Source::new("Quiet Books", "https://books.quiet.example/").with_category("Finance"),
    ]
}

fn fetcher() -> Arc<StaticFetcher> {
    Arc::new(
        StaticFetcher::new()
            .with_page("https://www.acme.example/crm/release-notes/", &fixture("release_notes.html"))
            .with_page("https://www.acme.example/news/", &fixture("newsroom.html"))
            .with_page(
                "https://books.quiet.example/",
                "<html><body><p>Just a landing page.</p></body></html>",
            ),
    )
}

#[tokio::test]
async fn full_batch_summary_and_categories() {
    let agg = Aggregator::new(quiet_cfg(), sources(), fetcher());
    let report = agg.run().await;

    assert_eq!(report.products.len(), 3);
    assert_eq!(report.categories, vec!["CRM & Sales", "News", "Finance"]);
    assert!(report.warning.is_none());

    let statuses: Vec<SourceStatus> = report.products.iter().map(|p| p.status).collect();
    assert_eq!(
        statuses,
        vec![SourceStatus::Ok, SourceStatus::Ok, SourceStatus::NoUpdatesFound]
    );

    let s = &report.summary;
    assert_eq!(s.total_products, 3);
    assert_eq!(s.products_with_updates, 2);
    assert_eq!(s.total_updates, 3 + 2);
    assert_eq!(s.by_category["CRM & Sales"].updates, 3);
    assert_eq!(s.by_category["News"].updates, 2);
    assert_eq!(s.by_category["Finance"].products, 1);
    assert_eq!(s.by_category["Finance"].updates, 0);
}

#[tokio::test]
async fn budget_exhaustion_returns_partial_report_with_warning() {
    let cfg = ScraperConfig {
        batch_budget_ms: 50,
        request_delay_ms: 120,
        ..quiet_cfg()
    };
    let agg = Aggregator::new(cfg, sources(), fetcher());
    let report = agg.run().await;

    // first source runs; waiting out the delay would overrun the budget
    assert_eq!(report.products.len(), 1);
    assert_eq!(report.summary.total_products, 3);
    let warning = report.warning.expect("partial batch warns");
    assert!(warning.contains("processed 1 of 3"), "{warning}");
}

#[tokio::test]
async fn delay_that_would_overrun_the_budget_is_skipped() {
    let cfg = ScraperConfig {
        batch_budget_ms: 300,
        request_delay_ms: 1000,
        ..quiet_cfg()
    };
    let agg = Aggregator::new(cfg, sources(), fetcher());
    let t0 = Instant::now();
    let report = agg.run().await;

    assert!(t0.elapsed() < Duration::from_millis(300), "{:?}", t0.elapsed());
    assert_eq!(report.products.len(), 1);
    assert!(report.warning.is_some());
}

#[tokio::test]
async fn no_delay_after_the_last_source() {
    let cfg = ScraperConfig {
        request_delay_ms: 400,
        ..quiet_cfg()
    };
    let one = vec![sources().remove(0)];
    let agg = Aggregator::new(cfg.clone(), one, fetcher());
    let t0 = Instant::now();
    agg.run().await;
    assert!(t0.elapsed() < Duration::from_millis(400));

    let two = sources().into_iter().take(2).collect();
    let agg = Aggregator::new(cfg, two, fetcher());
    let t0 = Instant::now();
    agg.run().await;
    assert!(t0.elapsed() >= Duration::from_millis(400));
}

#[tokio::test]
async fn debug_flag_attaches_diagnostics() {
    let agg = Aggregator::new(quiet_cfg(), sources(), fetcher());
    let plain = agg.run().await;
    assert!(plain.products.iter().all(|p| p.debug.is_none()));

    let report = agg
        .run_with(&RunRequest {
            category: None,
            debug: true,
        })
        .await;
    let dbg = report.products[0].debug.as_ref().unwrap();
    assert_eq!(dbg.template.as_deref(), Some("release_container"));
    assert_eq!(dbg.patterns_matched, 3);
    assert!(dbg.html_length > 1000);
}

#[tokio::test]
async fn report_json_round_trip_keeps_status_and_order() {
    let agg = Aggregator::new(quiet_cfg(), sources(), fetcher());
    let report = agg.run().await;

    let json = serde_json::to_string(&report).unwrap();
    let back: AggregateReport = serde_json::from_str(&json).unwrap();
    assert_eq!(back, report);

    let v: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(v["products"][0]["status"], "ok");
    assert_eq!(v["products"][2]["status"], "no_updates_found");
    assert_eq!(v["products"][0]["source_type"], "explicit");
    assert_eq!(v["products"][0]["updates"][0]["date"], "2024-06-12");
    assert_eq!(v["products"][0]["updates"][1]["date"], "2024-05-02");
    assert_eq!(v["products"][1]["updates"][0]["type"], "New Features");
    assert_eq!(v["summary"]["by_category"]["News"]["products"], 1);
    assert!(v.get("warning").is_none());
}
