// tests/metrics_http.rs
use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use updates_tracker::config::ScraperConfig;
use updates_tracker::metrics::Metrics;
use updates_tracker::scrape::fetch::StaticFetcher;
use updates_tracker::scrape::pipeline::SourcePipeline;
use updates_tracker::scrape::types::Source;

#[tokio::test]
async fn metrics_endpoint_contains_scrape_series() {
    let cfg = ScraperConfig {
        respect_robots: false,
        ..ScraperConfig::default()
    };
    Metrics::init(&cfg).expect("recorder installs");
    // a second init reuses the installed recorder
    let again = Metrics::init(&cfg).expect("init is idempotent");

    let p = SourcePipeline::new(Arc::new(StaticFetcher::new()), Arc::new(cfg));
    p.run(&Source::new("Nowhere", "https://nowhere.example/"), false)
        .await;

    let resp = again
        .router()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    assert!(text.contains("scrape_sources_total"), "{text}");
    assert!(text.contains(r#"status="error""#), "{text}");
    assert!(text.contains("scrape_fetch_errors_total"), "{text}");
    assert!(text.contains("scrape_batch_budget_ms"), "{text}");
}
