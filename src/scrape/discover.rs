// src/scrape/discover.rs
use std::time::Duration;

use crate::scrape::fetch::Fetcher;
use crate::scrape::origin_of;

/// Probe order matters: the first path that answers HEAD wins.
pub const DEFAULT_DISCOVERY_PATHS: &[&str] = &[
    "/whats-new",
    "/whatsnew",
    "/updates",
    "/release-notes",
    "/changelog",
    "/blog",
    "/news",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    pub found: Option<String>,
    /// Every candidate URL probed, in order.
    pub probed: Vec<String>,
}

/// Probe `paths` under the homepage origin and return the first that exists.
pub async fn discover(
    fetcher: &dyn Fetcher,
    homepage: &str,
    paths: &[String],
    timeout: Duration,
) -> Option<String> {
    discover_traced(fetcher, homepage, paths, timeout).await.found
}

/// Same as [`discover`] but also reports the probed URLs.
pub async fn discover_traced(
    fetcher: &dyn Fetcher,
    homepage: &str,
    paths: &[String],
    timeout: Duration,
) -> Discovery {
    let mut out = Discovery::default();
    let Some(origin) = origin_of(homepage) else {
        tracing::debug!(target: "scrape", %homepage, "no origin, skipping discovery");
        return out;
    };

    for path in paths {
        let candidate = format!("{origin}{path}");
        out.probed.push(candidate.clone());
        if fetcher.exists(&candidate, timeout).await {
            tracing::debug!(target: "scrape", url = %candidate, "discovered updates page");
            out.found = Some(candidate);
            break;
        }
    }
    out
}
