// src/scrape/aggregate.rs
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use metrics::gauge;

use crate::config::{categories_of, ScraperConfig};
use crate::scrape::fetch::Fetcher;
use crate::scrape::ensure_metrics_described;
use crate::scrape::pipeline::SourcePipeline;
use crate::scrape::types::{AggregateReport, Source, SourceResult, SourceStatus, Summary};

pub const ALL_FAILED_WARNING: &str = "Every source failed; see error_message per product";

/// Per-call options for a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunRequest {
    /// Restrict the batch to sources of this category (case-insensitive).
    pub category: Option<String>,
    /// Attach per-source debug info.
    pub debug: bool,
}

/// Runs the source pipeline over a fixed source list, one source at a time.
#[derive(Clone)]
pub struct Aggregator {
    pipeline: SourcePipeline,
    sources: Arc<Vec<Source>>,
}

impl Aggregator {
    pub fn new(cfg: ScraperConfig, sources: Vec<Source>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            pipeline: SourcePipeline::new(fetcher, Arc::new(cfg)),
            sources: Arc::new(sources),
        }
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn config(&self) -> &ScraperConfig {
        self.pipeline.config()
    }

    /// Distinct categories of all configured sources, first-seen order.
    pub fn categories(&self) -> Vec<String> {
        categories_of(&self.sources)
    }

    pub async fn run(&self) -> AggregateReport {
        self.run_with(&RunRequest::default()).await
    }

    pub async fn run_with(&self, req: &RunRequest) -> AggregateReport {
        ensure_metrics_described();
        let started = Instant::now();
        let cfg = self.pipeline.config();
        let budget = cfg.batch_budget();
        let delay = cfg.request_delay();

        let selected: Vec<&Source> = self
            .sources
            .iter()
            .filter(|s| {
                req.category
                    .as_deref()
                    .map_or(true, |c| s.category.eq_ignore_ascii_case(c.trim()))
            })
            .collect();
        let mut categories: Vec<String> = Vec::new();
        for s in &selected {
            if !categories.contains(&s.category) {
                categories.push(s.category.clone());
            }
        }

        tracing::info!(target: "scrape", sources = selected.len(), category = ?req.category, "batch start");

        let mut products: Vec<SourceResult> = Vec::with_capacity(selected.len());
        let mut warning = None;

        for (i, source) in selected.iter().enumerate() {
            // a pause before this source counts against the budget too
            let pause = if i > 0 { delay } else { Duration::ZERO };
            if started.elapsed() + pause > budget {
                tracing::warn!(
                    target: "scrape",
                    processed = i,
                    total = selected.len(),
                    "batch budget exhausted, stopping early"
                );
                warning = Some(format!(
                    "Time budget exhausted; processed {i} of {} sources",
                    selected.len()
                ));
                break;
            }
            if !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }

            products.push(self.pipeline.run(source, req.debug).await);
        }

        if warning.is_none()
            && !products.is_empty()
            && products.iter().all(|p| p.status == SourceStatus::Error)
        {
            warning = Some(ALL_FAILED_WARNING.to_string());
        }

        let summary = build_summary(selected.len(), &products);
        gauge!("scrape_last_run_ts").set(Utc::now().timestamp() as f64);
        tracing::info!(
            target: "scrape",
            products = products.len(),
            with_updates = summary.products_with_updates,
            updates = summary.total_updates,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch done"
        );

        AggregateReport {
            fetched_at: Utc::now(),
            products,
            categories,
            summary,
            warning,
        }
    }
}

/// Summary over the results that ran; `total` is the number of sources
/// the batch was asked to process.
pub fn build_summary(total: usize, results: &[SourceResult]) -> Summary {
    let mut summary = Summary {
        total_products: total,
        ..Summary::default()
    };
    for r in results {
        let n = r.updates.len();
        if n > 0 {
            summary.products_with_updates += 1;
            summary.total_updates += n;
        }
        let entry = summary.by_category.entry(r.category.clone()).or_default();
        entry.products += 1;
        entry.updates += n;
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::fetch::StaticFetcher;
    use crate::scrape::types::{CategoryStats, Priority, SourceType, UpdateItem, UpdateType};
    use chrono::NaiveDate;

    fn result(category: &str, updates: usize) -> SourceResult {
        let mut r = SourceResult::pending(&Source::new("x", "https://x.example").with_category(category));
        r.source_type = SourceType::Discovered;
        r.status = if updates > 0 { SourceStatus::Ok } else { SourceStatus::NoUpdatesFound };
        r.updates = (0..updates)
            .map(|i| UpdateItem {
                title: format!("Release train number {i}"),
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                summary: String::new(),
                link: "https://x.example".into(),
                kind: UpdateType::General,
                priority: Priority::Normal,
                category: category.into(),
            })
            .collect();
        r
    }

    #[test]
    fn summary_counts_products_and_updates_per_category() {
        let s = build_summary(4, &[result("Finance", 2), result("Finance", 0), result("CRM", 3)]);
        assert_eq!(s.total_products, 4);
        assert_eq!(s.products_with_updates, 2);
        assert_eq!(s.total_updates, 5);
        assert_eq!(s.by_category["Finance"], CategoryStats { products: 2, updates: 2 });
        assert_eq!(s.by_category["CRM"], CategoryStats { products: 1, updates: 3 });
    }

    #[tokio::test]
    async fn category_filter_and_all_failed_warning() {
        let cfg = ScraperConfig {
            request_delay_ms: 0,
            respect_robots: false,
            ..ScraperConfig::default()
        };
        let sources = vec![
            Source::new("A", "https://a.example/").with_category("Finance"),
            Source::new("B", "https://b.example/").with_category("News"),
        ];
        // nothing is served, so every fetch 404s
        let agg = Aggregator::new(cfg, sources, Arc::new(StaticFetcher::new()));
        assert_eq!(agg.categories(), vec!["Finance".to_string(), "News".to_string()]);

        let req = RunRequest {
            category: Some("news".into()),
            debug: false,
        };
        let report = agg.run_with(&req).await;
        assert_eq!(report.products.len(), 1);
        assert_eq!(report.products[0].name, "B");
        assert_eq!(report.categories, vec!["News".to_string()]);
        assert_eq!(report.summary.total_products, 1);
        assert_eq!(report.warning.as_deref(), Some(ALL_FAILED_WARNING));
    }
}
