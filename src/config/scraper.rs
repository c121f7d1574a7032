// src/config/scraper.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::scrape::discover::DEFAULT_DISCOVERY_PATHS;
use crate::scrape::extract::ExtractOptions;

pub const ENV_SCRAPER_CONFIG_PATH: &str = "SCRAPER_CONFIG_PATH";
pub const DEFAULT_USER_AGENT: &str = "UpdatesTrackerBot/1.0";

/// Timeouts are kept at least this far below the batch budget.
const BUDGET_HEADROOM_MS: u64 = 500;
const MIN_TIMEOUT_MS: u64 = 250;

/// Tunables for one scraping batch. Every field has a default, so a config
/// file only needs the keys it changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScraperConfig {
    pub user_agent: String,
    /// Politeness pause between consecutive sources.
    pub request_delay_ms: u64,
    pub fetch_timeout_ms: u64,
    pub probe_timeout_ms: u64,
    pub robots_timeout_ms: u64,
    /// Wall clock for a whole batch; checked before each source.
    pub batch_budget_ms: u64,
    pub max_body_bytes: usize,
    pub max_updates_per_source: usize,
    pub max_matches_per_template: usize,
    pub context_before: usize,
    pub context_after: usize,
    pub summary_max_chars: usize,
    pub respect_robots: bool,
    pub discovery_paths: Vec<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        let extract = ExtractOptions::default();
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_delay_ms: 1000,
            fetch_timeout_ms: 8000,
            probe_timeout_ms: 3000,
            robots_timeout_ms: 5000,
            batch_budget_ms: 8500,
            max_body_bytes: 2 * 1024 * 1024,
            max_updates_per_source: 5,
            max_matches_per_template: extract.max_matches_per_template,
            context_before: extract.context_before,
            context_after: extract.context_after,
            summary_max_chars: extract.summary_max_chars,
            respect_robots: true,
            discovery_paths: default_discovery_paths(),
        }
    }
}

fn default_discovery_paths() -> Vec<String> {
    DEFAULT_DISCOVERY_PATHS.iter().map(|p| p.to_string()).collect()
}

impl ScraperConfig {
    /// Load from an explicit path (TOML or JSON by extension, then by content).
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading scraper config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = parse(&content, &ext)
            .with_context(|| format!("parsing scraper config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Load using env var + fallbacks:
    /// 1) $SCRAPER_CONFIG_PATH
    /// 2) config/scraper.toml
    /// 3) config/scraper.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_SCRAPER_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_SCRAPER_CONFIG_PATH} points to non-existent path"));
        }
        let toml_p = PathBuf::from("config/scraper.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from("config/scraper.json");
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::default())
    }

    /// Clamp values that would break the batch contract.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();

        self.user_agent = self.user_agent.trim().to_string();
        if self.user_agent.is_empty() {
            self.user_agent = defaults.user_agent;
        }
        if self.batch_budget_ms == 0 {
            self.batch_budget_ms = defaults.batch_budget_ms;
        }

        let ceiling = self
            .batch_budget_ms
            .saturating_sub(BUDGET_HEADROOM_MS)
            .max(MIN_TIMEOUT_MS);
        for t in [
            &mut self.fetch_timeout_ms,
            &mut self.probe_timeout_ms,
            &mut self.robots_timeout_ms,
        ] {
            *t = (*t).clamp(MIN_TIMEOUT_MS, ceiling);
        }

        if self.max_body_bytes == 0 {
            self.max_body_bytes = defaults.max_body_bytes;
        }
        if self.max_updates_per_source == 0 {
            self.max_updates_per_source = defaults.max_updates_per_source;
        }
        if self.max_matches_per_template == 0 {
            self.max_matches_per_template = defaults.max_matches_per_template;
        }
        if self.summary_max_chars == 0 {
            self.summary_max_chars = defaults.summary_max_chars;
        }

        self.discovery_paths = self
            .discovery_paths
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(|p| {
                if p.starts_with('/') {
                    p.to_string()
                } else {
                    format!("/{p}")
                }
            })
            .collect();
        if self.discovery_paths.is_empty() {
            self.discovery_paths = defaults.discovery_paths;
        }
        self
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn robots_timeout(&self) -> Duration {
        Duration::from_millis(self.robots_timeout_ms)
    }

    pub fn batch_budget(&self) -> Duration {
        Duration::from_millis(self.batch_budget_ms)
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            max_matches_per_template: self.max_matches_per_template,
            context_before: self.context_before,
            context_after: self.context_after,
            summary_max_chars: self.summary_max_chars,
        }
    }
}

fn parse(s: &str, hint_ext: &str) -> Result<ScraperConfig> {
    if hint_ext == "json" {
        return serde_json::from_str(s).context("invalid JSON");
    }
    if hint_ext == "toml" {
        return toml::from_str(s).context("invalid TOML");
    }
    // No usable extension: JSON objects start with '{', anything else is TOML.
    if s.trim_start().starts_with('{') {
        serde_json::from_str(s).context("invalid JSON")
    } else {
        toml::from_str(s).context("invalid TOML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn partial_toml_keeps_defaults_for_missing_keys() {
        let cfg = parse("request_delay_ms = 2000\nrespect_robots = false\n", "toml").unwrap();
        assert_eq!(cfg.request_delay_ms, 2000);
        assert!(!cfg.respect_robots);
        assert_eq!(cfg.max_updates_per_source, 5);
        assert_eq!(cfg.discovery_paths.len(), DEFAULT_DISCOVERY_PATHS.len());
    }

    #[test]
    fn json_without_extension_is_detected() {
        let cfg = parse(r#"{"max_updates_per_source": 3}"#, "").unwrap();
        assert_eq!(cfg.max_updates_per_source, 3);
        assert!(parse("max_updates_per_source = [", "").is_err());
    }

    #[test]
    fn sanitize_clamps_timeouts_below_budget() {
        let cfg = ScraperConfig {
            batch_budget_ms: 4000,
            fetch_timeout_ms: 60_000,
            probe_timeout_ms: 0,
            ..ScraperConfig::default()
        }
        .sanitized();
        assert_eq!(cfg.fetch_timeout_ms, 3500);
        assert_eq!(cfg.probe_timeout_ms, MIN_TIMEOUT_MS);
        assert_eq!(cfg.robots_timeout_ms, 3500);
    }

    #[test]
    fn sanitize_normalizes_discovery_paths() {
        let cfg = ScraperConfig {
            discovery_paths: vec![" changelog ".into(), "".into(), "/news".into()],
            user_agent: "   ".into(),
            ..ScraperConfig::default()
        }
        .sanitized();
        assert_eq!(cfg.discovery_paths, vec!["/changelog".to_string(), "/news".to_string()]);
        assert_eq!(cfg.user_agent, DEFAULT_USER_AGENT);

        let cfg = ScraperConfig {
            discovery_paths: vec![],
            ..ScraperConfig::default()
        }
        .sanitized();
        assert_eq!(cfg.discovery_paths, default_discovery_paths());
    }

    #[test]
    fn defaults_survive_sanitizing_unchanged() {
        assert_eq!(ScraperConfig::default().sanitized(), ScraperConfig::default());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_SCRAPER_CONFIG_PATH);

        // no files in the temp CWD -> defaults
        assert_eq!(ScraperConfig::load_default().unwrap(), ScraperConfig::default());

        fs::create_dir_all(tmp.path().join("config")).unwrap();
        fs::write(tmp.path().join("config/scraper.json"), r#"{"request_delay_ms": 10}"#).unwrap();
        assert_eq!(ScraperConfig::load_default().unwrap().request_delay_ms, 10);

        // env wins over config/
        let p = tmp.path().join("custom.toml");
        fs::write(&p, "request_delay_ms = 20").unwrap();
        env::set_var(ENV_SCRAPER_CONFIG_PATH, p.display().to_string());
        assert_eq!(ScraperConfig::load_default().unwrap().request_delay_ms, 20);

        env::set_var(ENV_SCRAPER_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(ScraperConfig::load_default().is_err());

        env::remove_var(ENV_SCRAPER_CONFIG_PATH);
        env::set_current_dir(&old).unwrap();
    }
}
