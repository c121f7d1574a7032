// src/config/sources.rs
use anyhow::{anyhow, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::scrape::types::{Source, DEFAULT_CATEGORY};

pub const ENV_SOURCES_CONFIG_PATH: &str = "SOURCES_CONFIG_PATH";

#[derive(serde::Deserialize)]
struct SourcesFile {
    #[serde(default)]
    sources: Vec<Source>,
}

/// Load the source list from an explicit path. Supports TOML (`[[sources]]`)
/// or JSON (`{"sources": [...]}` or a bare array).
pub fn load_sources_from(path: &Path) -> Result<Vec<Source>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
        .with_context(|| format!("parsing sources {}", path.display()))
}

/// Load sources using env var + fallbacks:
/// 1) $SOURCES_CONFIG_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
/// 4) empty list
pub fn load_sources_default() -> Result<Vec<Source>> {
    if let Ok(p) = std::env::var(ENV_SOURCES_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        }
        return Err(anyhow!("{ENV_SOURCES_CONFIG_PATH} points to non-existent path"));
    }
    let toml_p = PathBuf::from("config/sources.toml");
    if toml_p.exists() {
        return load_sources_from(&toml_p);
    }
    let json_p = PathBuf::from("config/sources.json");
    if json_p.exists() {
        return load_sources_from(&json_p);
    }
    tracing::warn!("no sources config found, serving an empty report");
    Ok(Vec::new())
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<Vec<Source>> {
    let try_toml = hint_ext == "toml" || s.contains("[[sources]]");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported sources format"))
}

fn parse_toml(s: &str) -> Result<Vec<Source>> {
    let v: SourcesFile = toml::from_str(s)?;
    Ok(clean_sources(v.sources))
}

fn parse_json(s: &str) -> Result<Vec<Source>> {
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum JsonSources {
        Wrapped(SourcesFile),
        Bare(Vec<Source>),
    }
    let v: JsonSources = serde_json::from_str(s)?;
    let list = match v {
        JsonSources::Wrapped(f) => f.sources,
        JsonSources::Bare(list) => list,
    };
    Ok(clean_sources(list))
}

/// Trim fields, drop blank entries and repeated names (first wins), keep order.
fn clean_sources(items: Vec<Source>) -> Vec<Source> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for mut s in items {
        s.name = s.name.trim().to_string();
        s.homepage = s.homepage.trim().to_string();
        s.category = s.category.trim().to_string();
        if s.category.is_empty() {
            s.category = DEFAULT_CATEGORY.to_string();
        }
        s.updates_url = s
            .updates_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        if s.name.is_empty() || s.homepage.is_empty() {
            continue;
        }
        if !seen.insert(s.name.clone()) {
            continue;
        }
        out.push(s);
    }
    out
}

/// Distinct categories in first-seen order.
pub fn categories_of(sources: &[Source]) -> Vec<String> {
    let mut seen = HashSet::new();
    sources
        .iter()
        .filter(|s| seen.insert(s.category.as_str()))
        .map(|s| s.category.clone())
        .collect()
}
