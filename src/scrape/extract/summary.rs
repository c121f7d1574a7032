// src/scrape/extract/summary.rs
use once_cell::sync::Lazy;
use regex::Regex;

/// A sentence must be longer than this to count as a summary.
pub const MIN_SENTENCE_CHARS: usize = 20;

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));
static RE_SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").expect("sentence regex"));

/// Drop a tag cut in half by the context window at either end.
fn trim_partial_tags(s: &str) -> &str {
    let mut out = s;
    if let Some(gt) = out.find('>') {
        if out.find('<').map_or(true, |lt| gt < lt) {
            out = &out[gt + 1..];
        }
    }
    if let Some(lt) = out.rfind('<') {
        if !out[lt..].contains('>') {
            out = &out[..lt];
        }
    }
    out
}

/// Visible text of an HTML fragment: tags removed, entities decoded, whitespace collapsed.
pub fn html_to_text(fragment: &str) -> String {
    let no_tags = RE_TAGS.replace_all(trim_partial_tags(fragment), " ");
    let decoded = html_escape::decode_html_entities(&no_tags);
    RE_WS.replace_all(&decoded, " ").trim().to_string()
}

pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let cut: String = s.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

/// First real sentence near the title, or a generic line naming the source.
pub fn summarize(context: &str, title: &str, source_name: &str, max_chars: usize) -> String {
    let text = html_to_text(context);
    let without_title = text.replacen(title, "", 1);

    RE_SENTENCE_END
        .split(without_title.trim())
        .map(str::trim)
        .find(|s| s.chars().count() > MIN_SENTENCE_CHARS)
        .map(|s| truncate_chars(s, max_chars))
        .unwrap_or_else(|| format!("Update from {source_name}"))
}
