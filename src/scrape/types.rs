// src/scrape/types.rs
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CATEGORY: &str = "Other";

/// A configured product or news website.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub homepage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updates_url: Option<String>,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl Source {
    pub fn new(name: &str, homepage: &str) -> Self {
        Self {
            name: name.to_string(),
            homepage: homepage.to_string(),
            updates_url: None,
            category: default_category(),
        }
    }

    pub fn with_updates_url(mut self, url: &str) -> Self {
        self.updates_url = Some(url.to_string());
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum UpdateType {
    #[serde(rename = "New Features")]
    NewFeatures,
    #[serde(rename = "Improvements")]
    Improvements,
    #[serde(rename = "Bug Fixes")]
    BugFixes,
    #[serde(rename = "Security")]
    Security,
    #[serde(rename = "API Changes")]
    ApiChanges,
    #[serde(rename = "Press Release")]
    PressRelease,
    #[serde(rename = "News")]
    News,
    #[serde(rename = "General")]
    General,
}

impl UpdateType {
    pub fn label(self) -> &'static str {
        match self {
            UpdateType::NewFeatures => "New Features",
            UpdateType::Improvements => "Improvements",
            UpdateType::BugFixes => "Bug Fixes",
            UpdateType::Security => "Security",
            UpdateType::ApiChanges => "API Changes",
            UpdateType::PressRelease => "Press Release",
            UpdateType::News => "News",
            UpdateType::General => "General",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Priority {
    Critical,
    Major,
    Normal,
}

/// One extracted update. `kind` and `priority` hold placeholders until the
/// pipeline classifies the item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateItem {
    pub title: String,
    pub date: NaiveDate,
    pub summary: String,
    pub link: String,
    #[serde(rename = "type")]
    pub kind: UpdateType,
    pub priority: Priority,
    #[serde(default = "default_category")]
    pub category: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Ok,
    NoUpdatesFound,
    SourceBlockedByRobots,
    Error,
}

impl SourceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceStatus::Ok => "ok",
            SourceStatus::NoUpdatesFound => "no_updates_found",
            SourceStatus::SourceBlockedByRobots => "source_blocked_by_robots",
            SourceStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Explicit,
    Discovered,
}

/// Per-source diagnostics, attached only when the caller asks for them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceDebug {
    pub robots_checked: bool,
    pub robots_blocked: bool,
    /// Pages fetched (GET), in order.
    pub urls_tried: Vec<String>,
    /// Discovery candidates probed with HEAD.
    #[serde(default)]
    pub probed: Vec<String>,
    pub html_length: usize,
    pub patterns_matched: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    pub stages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceResult {
    pub name: String,
    pub homepage: String,
    pub category: String,
    pub updates_url: Option<String>,
    pub updates: Vec<UpdateItem>,
    pub status: SourceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<SourceDebug>,
}

impl SourceResult {
    /// Fresh result for `source`, before any stage has run.
    pub fn pending(source: &Source) -> Self {
        let source_type = if source.updates_url.is_some() {
            SourceType::Explicit
        } else {
            SourceType::Discovered
        };
        Self {
            name: source.name.clone(),
            homepage: source.homepage.clone(),
            category: source.category.clone(),
            updates_url: source.updates_url.clone(),
            updates: Vec::new(),
            status: SourceStatus::Error,
            error_message: None,
            source_type,
            debug: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryStats {
    pub products: usize,
    pub updates: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Summary {
    pub total_products: usize,
    pub products_with_updates: usize,
    pub total_updates: usize,
    pub by_category: BTreeMap<String, CategoryStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AggregateReport {
    pub fetched_at: DateTime<Utc>,
    pub products: Vec<SourceResult>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub summary: Summary,
    /// Set when the batch is partial (budget cut it short) or nothing succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}
