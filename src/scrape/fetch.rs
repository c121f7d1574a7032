// src/scrape/fetch.rs
//! Outbound HTTP: page bodies (GET, capped) and existence probes (HEAD).

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("HTTP {0}")]
    HttpStatus(u16),
    #[error("response larger than {0} bytes")]
    TooLarge(usize),
    #[error("network error: {0}")]
    Network(String),
}

impl FetchError {
    fn from_reqwest(e: reqwest::Error, timeout: Duration) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(timeout)
        } else if let Some(status) = e.status() {
            FetchError::HttpStatus(status.as_u16())
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `url`; non-2xx, overflow past `max_bytes` and timeouts are errors.
    async fn fetch(&self, url: &str, timeout: Duration, max_bytes: usize)
        -> Result<String, FetchError>;

    /// HEAD `url`; true for 2xx/3xx. Never fails.
    async fn exists(&self, url: &str, timeout: Duration) -> bool;
}

/// `reqwest`-backed fetcher used by the service.
pub struct HttpFetcher {
    http: reqwest::Client,
    // HEAD probes judge the first response, so redirects are not followed
    probe: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(4))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("building reqwest client")?;
        let probe = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(4))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("building reqwest probe client")?;
        Ok(Self { http, probe })
    }

    async fn get_capped(
        &self,
        url: &str,
        timeout: Duration,
        max_bytes: usize,
    ) -> Result<String, FetchError> {
        let mut resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, timeout))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }
        if resp
            .content_length()
            .is_some_and(|len| len > max_bytes as u64)
        {
            return Err(FetchError::TooLarge(max_bytes));
        }

        // Stream so an undeclared oversized body is abandoned mid-way.
        let mut buf: Vec<u8> = Vec::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| FetchError::from_reqwest(e, timeout))?
        {
            if buf.len() + chunk.len() > max_bytes {
                return Err(FetchError::TooLarge(max_bytes));
            }
            buf.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        timeout: Duration,
        max_bytes: usize,
    ) -> Result<String, FetchError> {
        // Dropping the in-flight future on timeout also drops the connection.
        match tokio::time::timeout(timeout, self.get_capped(url, timeout, max_bytes)).await {
            Ok(res) => res,
            Err(_) => Err(FetchError::Timeout(timeout)),
        }
    }

    async fn exists(&self, url: &str, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, self.probe.head(url).send()).await {
            Ok(Ok(resp)) => (200..400).contains(&resp.status().as_u16()),
            Ok(Err(e)) => {
                tracing::debug!(target: "scrape", %url, error = %e, "HEAD probe failed");
                false
            }
            Err(_) => {
                tracing::debug!(target: "scrape", %url, "HEAD probe timed out");
                false
            }
        }
    }
}

// --- Test helper ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchCall {
    Get(String),
    Head(String),
}

/// In-memory fetcher: fixed bodies/errors per URL, a set of URLs that answer
/// HEAD, and a log of every call made. Unknown URLs answer 404.
#[derive(Default)]
pub struct StaticFetcher {
    pages: HashMap<String, Result<String, FetchError>>,
    heads: HashSet<String>,
    calls: Mutex<Vec<FetchCall>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), Ok(body.to_string()));
        self
    }

    pub fn with_error(mut self, url: &str, err: FetchError) -> Self {
        self.pages.insert(url.to_string(), Err(err));
        self
    }

    pub fn with_head(mut self, url: &str) -> Self {
        self.heads.insert(url.to_string());
        self
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// URLs requested with GET, in order.
    pub fn gets(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                FetchCall::Get(u) => Some(u),
                FetchCall::Head(_) => None,
            })
            .collect()
    }

    fn record(&self, call: FetchCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(
        &self,
        url: &str,
        _timeout: Duration,
        max_bytes: usize,
    ) -> Result<String, FetchError> {
        self.record(FetchCall::Get(url.to_string()));
        match self.pages.get(url) {
            Some(Ok(body)) if body.len() > max_bytes => Err(FetchError::TooLarge(max_bytes)),
            Some(res) => res.clone(),
            None => Err(FetchError::HttpStatus(404)),
        }
    }

    async fn exists(&self, url: &str, _timeout: Duration) -> bool {
        self.record(FetchCall::Head(url.to_string()));
        self.heads.contains(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Duration = Duration::from_millis(100);

    #[tokio::test]
    async fn static_fetcher_serves_pages_and_logs_calls() {
        let f = StaticFetcher::new()
            .with_page("https://a.example/", "hello")
            .with_head("https://a.example/updates");

        assert_eq!(f.fetch("https://a.example/", T, 1024).await.unwrap(), "hello");
        assert_eq!(
            f.fetch("https://a.example/missing", T, 1024).await,
            Err(FetchError::HttpStatus(404))
        );
        assert!(f.exists("https://a.example/updates", T).await);
        assert!(!f.exists("https://a.example/blog", T).await);
        assert_eq!(f.calls().len(), 4);
        assert_eq!(
            f.gets(),
            vec!["https://a.example/".to_string(), "https://a.example/missing".to_string()]
        );
    }

    #[tokio::test]
    async fn static_fetcher_honours_size_cap() {
        let f = StaticFetcher::new().with_page("https://a.example/", "0123456789");
        assert_eq!(
            f.fetch("https://a.example/", T, 5).await,
            Err(FetchError::TooLarge(5))
        );
    }

    #[test]
    fn errors_render_short_messages() {
        assert_eq!(FetchError::HttpStatus(503).to_string(), "HTTP 503");
        assert_eq!(
            FetchError::Timeout(Duration::from_millis(1500)).to_string(),
            "request timed out after 1500ms"
        );
    }
}
