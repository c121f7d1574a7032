// src/scrape/extract/link.rs
use once_cell::sync::Lazy;
use regex::Regex;
use url::{Host, Url};

static RE_HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<a\b[^>]+href=["']([^"']+)["']"#).expect("href regex"));

/// Registrable-ish domain of a page: the last two host labels
/// (`www.zoho.com` -> `zoho.com`); IP hosts are returned whole.
pub fn publisher_domain(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Domain(d) => {
            let labels: Vec<&str> = d.trim_end_matches('.').split('.').collect();
            let start = labels.len().saturating_sub(2);
            Some(labels[start..].join(".").to_ascii_lowercase())
        }
        Host::Ipv4(ip) => Some(ip.to_string()),
        Host::Ipv6(ip) => Some(format!("[{ip}]")),
    }
}

fn same_publisher(candidate: &Url, domain: &str) -> bool {
    candidate.host_str().is_some_and(|h| {
        let h = h.to_ascii_lowercase();
        h == domain || h.ends_with(&format!(".{domain}"))
    })
}

/// First anchor in `context`, made absolute against `page_url`. Links leaving
/// the publisher's domain or using a non-http scheme fall back to the page itself.
pub fn find_link(context: &str, page_url: &str) -> String {
    let fallback = || page_url.to_string();

    let Some(href) = RE_HREF
        .captures(context)
        .and_then(|c| c.get(1))
        .map(|m| html_escape::decode_html_entities(m.as_str().trim()).into_owned())
    else {
        return fallback();
    };
    let Ok(page) = Url::parse(page_url) else {
        return fallback();
    };
    let Ok(resolved) = page.join(&href) else {
        return fallback();
    };
    if !matches!(resolved.scheme(), "http" | "https") {
        return fallback();
    }
    match publisher_domain(&page) {
        Some(domain) if same_publisher(&resolved, &domain) => resolved.to_string(),
        _ => fallback(),
    }
}
