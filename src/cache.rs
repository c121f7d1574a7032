// src/cache.rs
//! On-disk copy of the last report, used by `updates_client`.
//!
//! Envelope is `{cached_at, data}` in `<dir>/saas_updates_cache.json`, or
//! `saas_updates_cache_<category>.json` for a category-filtered report.
//! Entries older than the TTL are stale but still readable as a fallback.

use std::fs;
use std::future::Future;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scrape::types::AggregateReport;

pub const CACHE_KEY: &str = "saas_updates_cache";
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CachedReport {
    pub cached_at: DateTime<Utc>,
    pub data: AggregateReport,
}

impl CachedReport {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.cached_at).to_std().unwrap_or(Duration::ZERO)
    }
}

/// File stem for a report filtered to `category` (case-insensitive).
pub fn cache_key(category: Option<&str>) -> String {
    match category.map(str::trim).filter(|c| !c.is_empty()) {
        None => CACHE_KEY.to_string(),
        Some(c) => {
            let slug: String = c
                .chars()
                .map(|ch| {
                    if ch.is_ascii_alphanumeric() {
                        ch.to_ascii_lowercase()
                    } else {
                        '_'
                    }
                })
                .collect();
            format!("{CACHE_KEY}_{slug}")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedFrom {
    Cache,
    Network,
    /// Fetch failed; an expired entry was used instead.
    StaleCache,
}

#[derive(Debug, Clone)]
pub struct Served {
    pub entry: CachedReport,
    pub from: ServedFrom,
}

#[derive(Debug, Clone)]
pub struct ReportCache {
    path: PathBuf,
    ttl: Duration,
}

impl ReportCache {
    /// Cache for the unfiltered report.
    pub fn new(dir: &Path, ttl: Duration) -> Self {
        Self::for_category(dir, ttl, None)
    }

    pub fn for_category(dir: &Path, ttl: Duration, category: Option<&str>) -> Self {
        Self {
            path: dir.join(format!("{}.json", cache_key(category))),
            ttl,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached report if present, readable and younger than the TTL.
    pub fn load_fresh(&self) -> Option<CachedReport> {
        self.load_fresh_at(Utc::now())
    }

    pub fn load_fresh_at(&self, now: DateTime<Utc>) -> Option<CachedReport> {
        self.load_any().filter(|c| c.age(now) < self.ttl)
    }

    /// Cached report regardless of age. Unreadable files count as missing.
    pub fn load_any(&self) -> Option<CachedReport> {
        let s = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&s) {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring corrupt report cache");
                None
            }
        }
    }

    /// Write-through after a successful fetch (tmp file + rename).
    pub fn store(&self, data: &AggregateReport) -> io::Result<CachedReport> {
        let entry = CachedReport {
            cached_at: Utc::now(),
            data: data.clone(),
        };
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string(&entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let tmp = self.path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp)?;
        f.write_all(json.as_bytes())?;
        fs::rename(tmp, &self.path)?;
        Ok(entry)
    }

    /// Serve a fresh entry without calling `fetch`, otherwise fetch and store.
    /// `refresh` drops the entry first. A failed fetch falls back to the last
    /// entry of any age and is only an error when there is none.
    pub async fn read_through<F, Fut>(&self, refresh: bool, fetch: F) -> anyhow::Result<Served>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<AggregateReport>>,
    {
        // kept in memory so a failed refresh can still fall back
        let previous = self.load_any();
        if refresh {
            self.clear().context("clearing report cache")?;
        } else if let Some(hit) = previous.as_ref().filter(|c| c.age(Utc::now()) < self.ttl) {
            tracing::info!(path = %self.path.display(), "serving fresh cache");
            return Ok(Served {
                entry: hit.clone(),
                from: ServedFrom::Cache,
            });
        }

        match fetch().await {
            Ok(report) => {
                let entry = match self.store(&report) {
                    Ok(entry) => entry,
                    Err(e) => {
                        tracing::warn!(path = %self.path.display(), error = %e, "could not write report cache");
                        CachedReport {
                            cached_at: Utc::now(),
                            data: report,
                        }
                    }
                };
                Ok(Served {
                    entry,
                    from: ServedFrom::Network,
                })
            }
            Err(e) => match previous {
                Some(stale) => {
                    tracing::warn!(error = %e, "fetch failed, falling back to cached report");
                    Ok(Served {
                        entry: stale,
                        from: ServedFrom::StaleCache,
                    })
                }
                None => Err(e.context("no cached report to fall back to")),
            },
        }
    }

    /// Drop the cached entry; a missing file is fine.
    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
