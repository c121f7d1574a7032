// src/scrape/classify.rs
//! Keyword classifier for update type and priority.
//!
//! Best-effort grouping for the dashboard, not an accuracy claim. Tables are
//! ordered: type ties go to the label declared first, priority takes the first
//! label with any hit.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::scrape::types::{Priority, UpdateType};

struct Rule<L> {
    label: L,
    patterns: Vec<Regex>,
}

fn words<L>(label: L, keywords: &[&str]) -> Rule<L> {
    let patterns = keywords
        .iter()
        .map(|w| Regex::new(&format!(r"\b(?:{w})\b")).expect("classifier keyword regex"))
        .collect();
    Rule { label, patterns }
}

static TYPE_TABLE: Lazy<Vec<Rule<UpdateType>>> = Lazy::new(|| {
    vec![
        words(
            UpdateType::NewFeatures,
            &["new", "introduc(?:ing|es|ed)", "launch(?:es|ed)?", "features?", "added", "released", "announcing"],
        ),
        words(
            UpdateType::Improvements,
            &["enhanced", "improve(?:d|ments?)", "better", "optimi[sz]ed", "upgrade[sd]?", "updated"],
        ),
        words(
            UpdateType::BugFixes,
            &["fixed", "resolved", "bugs?", "issues?", "corrected", "patch(?:ed)?"],
        ),
        words(
            UpdateType::Security,
            &["security", "vulnerabilit(?:y|ies)", "secure", "authentication"],
        ),
        words(
            UpdateType::ApiChanges,
            &["api", "integrations?", "endpoints?", "webhooks?", "developers?"],
        ),
        words(
            UpdateType::PressRelease,
            &["press", "announcement", "partnership", "acquisition", "acquires?"],
        ),
        words(
            UpdateType::News,
            &["news", "newsletter", "in the news", "coverage", "interview"],
        ),
    ]
});

static PRIORITY_TABLE: Lazy<Vec<Rule<Priority>>> = Lazy::new(|| {
    vec![
        words(
            Priority::Critical,
            &["critical", "urgent", "security", "vulnerabilit(?:y|ies)", "breach"],
        ),
        words(
            Priority::Major,
            &[
                "major", "significant", "release", "version", "launch(?:es|ed)?", "breaking",
                "important", "acquisition", "partnership", "funding",
            ],
        ),
    ]
});

fn haystack(title: &str, summary: &str) -> String {
    format!("{title} {summary}").to_lowercase()
}

/// Label with the most keyword hits over title + summary; `General` when none hit.
pub fn classify_type(title: &str, summary: &str) -> UpdateType {
    let text = haystack(title, summary);
    let mut best: Option<(UpdateType, usize)> = None;
    for rule in TYPE_TABLE.iter() {
        let score = rule.patterns.iter().filter(|p| p.is_match(&text)).count();
        // strict `>` keeps the first-declared label on ties
        if score > 0 && best.map_or(true, |(_, top)| score > top) {
            best = Some((rule.label, score));
        }
    }
    best.map(|(label, _)| label).unwrap_or(UpdateType::General)
}

/// First priority label with any hit; `Normal` otherwise.
pub fn classify_priority(title: &str, summary: &str) -> Priority {
    let text = haystack(title, summary);
    PRIORITY_TABLE
        .iter()
        .find(|rule| rule.patterns.iter().any(|p| p.is_match(&text)))
        .map(|rule| rule.label)
        .unwrap_or(Priority::Normal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn introducing_is_a_new_feature() {
        assert_eq!(
            classify_type("Introducing Smart Filters for 2024", ""),
            UpdateType::NewFeatures
        );
    }

    #[test]
    fn highest_score_wins() {
        // one New Features hit ("new") vs two Bug Fixes hits ("fixed", "issue")
        assert_eq!(
            classify_type("New build: fixed sync issue", ""),
            UpdateType::BugFixes
        );
    }

    #[test]
    fn ties_go_to_first_declared_label() {
        // one hit each: Improvements ("improved") and Security ("security")
        assert_eq!(classify_type("Improved security dashboard", ""), UpdateType::Improvements);
        // one hit each: Bug Fixes ("patch") and API Changes ("webhook")
        assert_eq!(classify_type("Webhook patch", ""), UpdateType::BugFixes);
    }

    #[test]
    fn summary_counts_and_no_hits_is_general() {
        assert_eq!(
            classify_type("Quarterly roundup", "Our partnership with a bank"),
            UpdateType::PressRelease
        );
        assert_eq!(classify_type("Quarterly roundup", "From the team"), UpdateType::General);
        assert_eq!(classify_type("Acme in the news this week", ""), UpdateType::News);
    }

    #[test]
    fn word_boundaries_apply() {
        // "newsroom" is neither "new" nor "news"; "rapid" is not "api"
        assert_eq!(classify_type("Newsroom rapid recap", ""), UpdateType::General);
    }

    #[test]
    fn priority_first_match_wins() {
        assert_eq!(classify_priority("Critical security release", ""), Priority::Critical);
        assert_eq!(classify_priority("Version 5 is here", ""), Priority::Major);
        assert_eq!(classify_priority("Tips for teams", "small tweaks"), Priority::Normal);
    }

    #[test]
    fn classification_is_pure() {
        let a = classify_type("Enhanced API endpoints", "faster webhooks");
        let _ = classify_type("Fixed bug", "");
        let _ = classify_priority("Urgent", "");
        assert_eq!(classify_type("Enhanced API endpoints", "faster webhooks"), a);
    }
}
