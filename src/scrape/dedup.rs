// src/scrape/dedup.rs
use std::collections::HashSet;

use crate::scrape::types::UpdateItem;

/// Normalized titles this short or shorter are dropped as meaningless.
pub const MIN_NORMALIZED_TITLE_LEN: usize = 10;

/// Lowercase ASCII alphanumerics only: `"Smart Filters, v2!"` -> `"smartfiltersv2"`.
pub fn normalize_title(title: &str) -> String {
    title
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Keep the first item per normalized title, newest first, at most `max` items.
/// Items with equal dates keep their input order.
pub fn dedupe(items: Vec<UpdateItem>, max: usize) -> Vec<UpdateItem> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut keep: Vec<UpdateItem> = items
        .into_iter()
        .filter(|it| {
            let key = normalize_title(&it.title);
            key.len() > MIN_NORMALIZED_TITLE_LEN && seen.insert(key)
        })
        .collect();

    keep.sort_by(|a, b| b.date.cmp(&a.date));
    keep.truncate(max);
    keep
}
