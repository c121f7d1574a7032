// src/scrape/pipeline.rs
//! Per-source state machine:
//! `Init -> RobotsCheck -> {Blocked | Allowed} -> TryExplicit -> TryDiscovered
//!  -> TryHomepage -> Classify -> Dedupe -> Done`.
//!
//! A source always ends in exactly one status. Fetch failures are recorded and
//! the next fallback runs; anything else that goes wrong is caught in
//! [`SourcePipeline::run`] and reported as `error`.

use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use metrics::{counter, histogram};

use crate::config::ScraperConfig;
use crate::scrape::classify::{classify_priority, classify_type};
use crate::scrape::dedup::dedupe;
use crate::scrape::discover::discover_traced;
use crate::scrape::extract::Extractor;
use crate::scrape::fetch::Fetcher;
use crate::scrape::types::{
    Source, SourceDebug, SourceResult, SourceStatus, SourceType, UpdateItem,
};
use crate::scrape::{ensure_metrics_described, origin_of, robots};

pub const NO_UPDATES_MESSAGE: &str = "No updates found on any checked pages";
pub const BLOCKED_MESSAGE: &str = "Disallowed by robots.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    RobotsCheck,
    Blocked,
    Allowed,
    TryExplicit,
    TryDiscovered,
    TryHomepage,
    Classify,
    Dedupe,
    Done,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::RobotsCheck => "robots_check",
            Stage::Blocked => "blocked",
            Stage::Allowed => "allowed",
            Stage::TryExplicit => "try_explicit",
            Stage::TryDiscovered => "try_discovered",
            Stage::TryHomepage => "try_homepage",
            Stage::Classify => "classify",
            Stage::Dedupe => "dedupe",
            Stage::Done => "done",
        }
    }
}

/// Mutable state of one source run.
struct Run<'a> {
    source: &'a Source,
    result: SourceResult,
    debug: SourceDebug,
    failures: Vec<String>,
}

impl<'a> Run<'a> {
    fn new(source: &'a Source) -> Self {
        Self {
            source,
            result: SourceResult::pending(source),
            debug: SourceDebug::default(),
            failures: Vec::new(),
        }
    }

    fn enter(&mut self, stage: Stage) {
        tracing::debug!(target: "scrape", source = %self.source.name, stage = stage.as_str(), "stage");
        self.debug.stages.push(stage.as_str().to_string());
    }

    fn tried(&self, url: &str) -> bool {
        self.debug.urls_tried.iter().any(|u| u == url)
    }
}

#[derive(Clone)]
pub struct SourcePipeline {
    fetcher: Arc<dyn Fetcher>,
    cfg: Arc<ScraperConfig>,
    extractor: Extractor,
}

impl SourcePipeline {
    pub fn new(fetcher: Arc<dyn Fetcher>, cfg: Arc<ScraperConfig>) -> Self {
        let extractor = Extractor::new(cfg.extract_options());
        Self {
            fetcher,
            cfg,
            extractor,
        }
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.cfg
    }

    /// Scrape one source. Never fails; `debug` attaches [`SourceDebug`].
    pub async fn run(&self, source: &Source, debug: bool) -> SourceResult {
        ensure_metrics_described();
        let started = Instant::now();

        let mut run = Run::new(source);
        if let Err(e) = self.run_stages(&mut run).await {
            tracing::warn!(target: "scrape", source = %source.name, error = %e, "source failed");
            run.result.updates.clear();
            run.result.status = SourceStatus::Error;
            run.result.error_message = Some(format!("{e:#}"));
            run.enter(Stage::Done);
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let status = run.result.status;
        counter!("scrape_sources_total", "status" => status.as_str()).increment(1);
        counter!("scrape_updates_total").increment(run.result.updates.len() as u64);
        histogram!("scrape_source_ms").record(elapsed_ms as f64);
        tracing::info!(
            target: "scrape",
            source = %source.name,
            status = status.as_str(),
            updates = run.result.updates.len(),
            elapsed_ms,
            "source done"
        );

        let mut result = run.result;
        if debug {
            result.debug = Some(run.debug);
        }
        result
    }

    async fn run_stages(&self, run: &mut Run<'_>) -> anyhow::Result<()> {
        let source = run.source;
        run.enter(Stage::Init);
        let origin = origin_of(&source.homepage)
            .ok_or_else(|| anyhow!("invalid homepage URL: {:?}", source.homepage))?;

        if self.cfg.respect_robots {
            run.enter(Stage::RobotsCheck);
            run.debug.robots_checked = true;
            let blocked = robots::check(
                self.fetcher.as_ref(),
                &origin,
                &self.cfg.user_agent,
                self.cfg.robots_timeout(),
            )
            .await;
            if blocked {
                run.debug.robots_blocked = true;
                run.enter(Stage::Blocked);
                run.result.status = SourceStatus::SourceBlockedByRobots;
                run.result.error_message = Some(BLOCKED_MESSAGE.to_string());
                run.enter(Stage::Done);
                return Ok(());
            }
            run.enter(Stage::Allowed);
        }

        let mut items: Vec<UpdateItem> = Vec::new();

        if let Some(url) = source.updates_url.as_deref() {
            run.enter(Stage::TryExplicit);
            items = self.scrape_page(run, url).await;
        }

        if items.is_empty() {
            run.enter(Stage::TryDiscovered);
            let found = discover_traced(
                self.fetcher.as_ref(),
                &source.homepage,
                &self.cfg.discovery_paths,
                self.cfg.probe_timeout(),
            )
            .await;
            run.debug.probed.extend(found.probed);
            if let Some(url) = found.found {
                run.result.source_type = SourceType::Discovered;
                run.result.updates_url = Some(url.clone());
                if !run.tried(&url) {
                    items = self.scrape_page(run, &url).await;
                }
            }
        }

        if items.is_empty() {
            run.enter(Stage::TryHomepage);
            run.result.updates_url = Some(source.homepage.clone());
            if !run.tried(&source.homepage) {
                items = self.scrape_page(run, &source.homepage).await;
            }
        }

        if items.is_empty() {
            run.enter(Stage::Done);
            if run.failures.is_empty() {
                run.result.status = SourceStatus::NoUpdatesFound;
                run.result.error_message = Some(NO_UPDATES_MESSAGE.to_string());
            } else {
                run.result.status = SourceStatus::Error;
                run.result.error_message = Some(run.failures.join("; "));
            }
            return Ok(());
        }

        run.enter(Stage::Classify);
        for it in items.iter_mut() {
            it.kind = classify_type(&it.title, &it.summary);
            it.priority = classify_priority(&it.title, &it.summary);
            it.category = source.category.clone();
        }

        run.enter(Stage::Dedupe);
        let updates = dedupe(items, self.cfg.max_updates_per_source);
        run.enter(Stage::Done);
        if updates.is_empty() {
            run.result.status = SourceStatus::NoUpdatesFound;
            run.result.error_message = Some(NO_UPDATES_MESSAGE.to_string());
        } else {
            run.result.status = SourceStatus::Ok;
            run.result.error_message = None;
        }
        run.result.updates = updates;
        Ok(())
    }

    /// Fetch + extract one page. Failures are recorded on `run`, not returned.
    async fn scrape_page(&self, run: &mut Run<'_>, url: &str) -> Vec<UpdateItem> {
        run.debug.urls_tried.push(url.to_string());
        let body = match self
            .fetcher
            .fetch(url, self.cfg.fetch_timeout(), self.cfg.max_body_bytes)
            .await
        {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(target: "scrape", source = %run.source.name, %url, error = %e, "fetch failed");
                counter!("scrape_fetch_errors_total").increment(1);
                run.failures.push(format!("{url}: {e}"));
                return Vec::new();
            }
        };

        let ex = self
            .extractor
            .extract_at(&body, url, &run.source.name, chrono::Utc::now().date_naive());
        run.debug.html_length = ex.stats.html_length;
        run.debug.patterns_matched += ex.stats.patterns_matched;
        if let Some(name) = ex.stats.matched_template {
            run.debug.template = Some(name.to_string());
        }
        ex.items
    }
}
