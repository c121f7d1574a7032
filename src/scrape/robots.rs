// src/scrape/robots.rs
//! Minimal robots.txt gate: we only care whether the site root is disallowed
//! for our agent. Anything we cannot fetch or read counts as allowed.

use std::time::Duration;

use crate::scrape::fetch::Fetcher;

const ROBOTS_MAX_BYTES: usize = 256 * 1024;

/// Product token of a User-Agent string: `UpdatesTrackerBot/1.0` -> `updatestrackerbot`.
fn agent_token(user_agent: &str) -> String {
    user_agent
        .split(['/', ' '])
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[derive(Debug, Default)]
struct Group {
    agents: Vec<String>,
    disallows_root: bool,
}

fn parse_groups(robots_txt: &str) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    // Consecutive User-agent lines share one group.
    let mut collecting_agents = false;

    for raw in robots_txt.lines() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        match key.as_str() {
            "user-agent" => {
                if !collecting_agents || groups.is_empty() {
                    groups.push(Group::default());
                }
                if let Some(g) = groups.last_mut() {
                    g.agents.push(value.to_ascii_lowercase());
                }
                collecting_agents = true;
            }
            "disallow" => {
                collecting_agents = false;
                if value == "/" {
                    if let Some(g) = groups.last_mut() {
                        g.disallows_root = true;
                    }
                }
            }
            _ => collecting_agents = false,
        }
    }
    groups
}

/// True when the group addressed to `user_agent` (or `*` if none names it)
/// contains `Disallow: /`.
pub fn is_blocked(robots_txt: &str, user_agent: &str) -> bool {
    let token = agent_token(user_agent);
    let groups = parse_groups(robots_txt);

    let names_us = |g: &Group| {
        !token.is_empty()
            && g.agents
                .iter()
                .any(|a| a.as_str() == token)
    };

    let specific: Vec<&Group> = groups.iter().filter(|g| names_us(g)).collect();
    if !specific.is_empty() {
        return specific.iter().any(|g| g.disallows_root);
    }
    groups
        .iter()
        .filter(|g| g.agents.iter().any(|a| a == "*"))
        .any(|g| g.disallows_root)
}

/// Fetch `{origin}/robots.txt` and evaluate it. Fails open.
pub async fn check(
    fetcher: &dyn Fetcher,
    origin: &str,
    user_agent: &str,
    timeout: Duration,
) -> bool {
    let url = format!("{}/robots.txt", origin.trim_end_matches('/'));
    match fetcher.fetch(&url, timeout, ROBOTS_MAX_BYTES).await {
        Ok(body) => is_blocked(&body, user_agent),
        Err(e) => {
            tracing::debug!(target: "scrape", %url, error = %e, "robots.txt unavailable, assuming allowed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::fetch::{FetchError, StaticFetcher};

    const UA: &str = "UpdatesTrackerBot/1.0";

    #[test]
    fn wildcard_root_disallow_blocks() {
        assert!(is_blocked("User-agent: *\nDisallow: /", UA));
        assert!(is_blocked("user-agent: *\r\ndisallow: /   # everything\r\n", UA));
    }

    #[test]
    fn partial_or_empty_disallow_does_not_block() {
        assert!(!is_blocked("User-agent: *\nDisallow: /admin\nDisallow: /private", UA));
        assert!(!is_blocked("User-agent: *\nDisallow:", UA));
        assert!(!is_blocked("", UA));
    }

    #[test]
    fn other_agents_are_ignored() {
        let txt = "User-agent: GPTBot\nDisallow: /\n\nUser-agent: *\nDisallow: /tmp";
        assert!(!is_blocked(txt, UA));
    }

    #[test]
    fn our_group_overrides_wildcard() {
        let txt = "User-agent: *\nDisallow: /\n\nUser-agent: UpdatesTrackerBot\nDisallow:";
        assert!(!is_blocked(txt, UA));
        let txt = "User-agent: Googlebot\nUser-agent: updatestrackerbot\nDisallow: /\n";
        assert!(is_blocked(txt, UA));
    }

    #[test]
    fn agent_names_must_match_our_token_exactly() {
        // "Update" and "bot" are substrings of our token but name other crawlers
        let txt = "User-agent: Update\nDisallow: /private\n\nUser-agent: *\nDisallow: /\n";
        assert!(is_blocked(txt, UA));
        let txt = "User-agent: bot\nDisallow:\n\nUser-agent: *\nDisallow: /\n";
        assert!(is_blocked(txt, UA));
        let txt = "User-agent: UpdatesTrackerBotPro\nDisallow: /\n";
        assert!(!is_blocked(txt, UA));
    }

    #[tokio::test]
    async fn fetch_failure_fails_open() {
        let f = StaticFetcher::new().with_error(
            "https://a.example/robots.txt",
            FetchError::Network("connection refused".into()),
        );
        assert!(!check(&f, "https://a.example", UA, Duration::from_millis(50)).await);

        let f = StaticFetcher::new().with_page("https://b.example/robots.txt", "User-agent: *\nDisallow: /");
        assert!(check(&f, "https://b.example/", UA, Duration::from_millis(50)).await);
    }
}
