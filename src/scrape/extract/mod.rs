// src/scrape/extract/mod.rs
//! Regex-template extraction of update items from raw HTML.
//!
//! Templates run from most specific (heading inside a release/update container)
//! to most generic (any short heading). The first template that yields at least
//! one valid title wins and later templates are not tried. Date, summary and
//! link come from a fixed window of raw HTML around each title.

pub mod date;
pub mod link;
pub mod summary;

use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::scrape::types::{Priority, UpdateItem, UpdateType};

/// Pages shorter than this are error stubs; no template is run on them.
pub const MIN_HTML_LEN: usize = 100;
pub const MIN_TITLE_CHARS: usize = 10;
pub const MAX_TITLE_CHARS: usize = 300;

/// Case-insensitive substrings that mark boilerplate headings.
pub const TITLE_DENYLIST: &[&str] = &[
    "cookie",
    "privacy",
    "terms",
    "sign in",
    "sign up",
    "login",
    "register",
    "home",
    "about",
    "contact",
    "help",
    "support",
    "404",
    "error",
    "page not found",
    "search",
    "navigation",
];

pub struct Template {
    pub name: &'static str,
    pattern: Regex,
}

fn template(name: &'static str, pattern: &str) -> Template {
    Template {
        name,
        pattern: Regex::new(pattern).expect("extraction template regex"),
    }
}

static TEMPLATES: Lazy<Vec<Template>> = Lazy::new(|| {
    vec![
        template(
            "release_container",
            r"(?is)<(?:div|section|article|li)\b[^>]*class[^>]*(?:release|update|changelog|version)[^>]*>.*?<h[1-6][^>]*>([^<]{15,200})</h[1-6]>",
        ),
        template(
            "article",
            r"(?is)<article\b[^>]*>.*?<h[1-6][^>]*>([^<]{20,200})</h[1-6]>.*?</article>",
        ),
        template(
            "news_container",
            r"(?is)<(?:div|li)\b[^>]*class[^>]*(?:news|item|post|press|blog|topic|newsletter)[^>]*>.*?<h[1-6][^>]*>([^<]{15,250})</h[1-6]>",
        ),
        template(
            "topic_row",
            r"(?is)<tr\b[^>]*class[^>]*topic[^>]*>.*?<a\b[^>]*>([^<]{15,200})</a>",
        ),
        template(
            "version_heading",
            r"(?i)<h[1-6][^>]*>([^<]*(?:version|v[0-9]+|[0-9]+\.[0-9]+|release|update)[^<]*)</h[1-6]>",
        ),
        template(
            "generic_heading",
            r"(?i)<h[1-4][^>]*>([^<]{20,180})</h[1-4]>",
        ),
    ]
});

/// Names of the templates in the order they are tried.
pub fn template_names() -> Vec<&'static str> {
    TEMPLATES.iter().map(|t| t.name).collect()
}

/// Length bounds plus the boilerplate denylist.
pub fn is_valid_title(title: &str) -> bool {
    let len = title.chars().count();
    if !(MIN_TITLE_CHARS..=MAX_TITLE_CHARS).contains(&len) {
        return false;
    }
    let lower = title.to_lowercase();
    !TITLE_DENYLIST.iter().any(|w| lower.contains(w))
}

fn clean_title(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Byte window `[pos - before, pos + after)` clamped to the document and to
/// char boundaries.
pub fn context_window(html: &str, pos: usize, before: usize, after: usize) -> &str {
    let mut start = pos.saturating_sub(before).min(html.len());
    while !html.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = pos.saturating_add(after).min(html.len());
    while !html.is_char_boundary(end) {
        end += 1;
    }
    &html[start..end]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    pub max_matches_per_template: usize,
    pub context_before: usize,
    pub context_after: usize,
    pub summary_max_chars: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_matches_per_template: 10,
            context_before: 400,
            context_after: 600,
            summary_max_chars: 180,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub html_length: usize,
    pub templates_tried: usize,
    pub matched_template: Option<&'static str>,
    pub patterns_matched: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub items: Vec<UpdateItem>,
    pub stats: ExtractStats,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Extractor {
    opts: ExtractOptions,
}

impl Extractor {
    pub fn new(opts: ExtractOptions) -> Self {
        Self { opts }
    }

    /// Unclassified items found on `html`; undated items get today's date.
    pub fn extract(&self, html: &str, page_url: &str, source_name: &str) -> Vec<UpdateItem> {
        self.extract_at(html, page_url, source_name, Utc::now().date_naive())
            .items
    }

    /// [`Extractor::extract`] with an explicit "today" and run statistics.
    pub fn extract_at(
        &self,
        html: &str,
        page_url: &str,
        source_name: &str,
        today: NaiveDate,
    ) -> Extraction {
        let mut out = Extraction {
            items: Vec::new(),
            stats: ExtractStats {
                html_length: html.len(),
                ..ExtractStats::default()
            },
        };
        if html.len() < MIN_HTML_LEN {
            return out;
        }

        for tpl in TEMPLATES.iter() {
            out.stats.templates_tried += 1;
            let mut found = 0usize;

            for caps in tpl.pattern.captures_iter(html) {
                if found >= self.opts.max_matches_per_template {
                    break;
                }
                let Some(m) = caps.get(1) else {
                    continue;
                };
                let title = clean_title(m.as_str());
                if !is_valid_title(&title) {
                    continue;
                }

                let ctx = context_window(
                    html,
                    m.start(),
                    self.opts.context_before,
                    self.opts.context_after,
                );
                out.items.push(UpdateItem {
                    date: date::find_date(ctx).unwrap_or(today),
                    summary: summary::summarize(
                        ctx,
                        &title,
                        source_name,
                        self.opts.summary_max_chars,
                    ),
                    link: link::find_link(ctx, page_url),
                    title,
                    kind: UpdateType::General,
                    priority: Priority::Normal,
                    category: String::new(),
                });
                found += 1;
            }

            if found > 0 {
                out.stats.matched_template = Some(tpl.name);
                out.stats.patterns_matched = found;
                break;
            }
        }

        tracing::debug!(
            target: "scrape",
            url = %page_url,
            html_len = out.stats.html_length,
            template = out.stats.matched_template.unwrap_or("none"),
            items = out.items.len(),
            "extracted"
        );
        out
    }
}
