//! Link enrichment: pull external URLs out of record bodies and resolve each
//! to its page title on a bounded budget. Fetch failures are non-fatal; the
//! link is kept with a null title.

use crate::record::Link;
use anyhow::{Context, Result};
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;
use std::time::Duration;

const BROWSER_UA: &str = "Mozilla/5.0 (compatible; snoosift/0.1)";

static URL_RE: OnceLock<Regex> = OnceLock::new();

fn url_regex() -> &'static Regex {
    // Stops at whitespace and the closing punctuation markdown wraps URLs in.
    URL_RE.get_or_init(|| Regex::new(r#"https?://[^\s)>"'\]]+"#).unwrap())
}

/// All external URLs found in `text`, in order of appearance.
pub fn extract_urls(text: &str) -> Vec<String> {
    url_regex().find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// Resolves a URL to its page title, or `None` on any failure.
pub trait TitleFetcher: Send + Sync {
    fn page_title(&self, url: &str) -> Option<String>;
}

/// Build the links list for a record body: every extracted URL, each with the
/// fetcher's best-effort title.
pub fn enrich_links(body: &str, fetcher: &dyn TitleFetcher) -> Vec<Link> {
    extract_urls(body)
        .into_iter()
        .map(|url| {
            let title = fetcher.page_title(&url);
            Link { url, title }
        })
        .collect()
}

/// Extract the trimmed `<title>` text from an HTML document.
pub fn html_title(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let sel = Selector::parse("title").ok()?;
    let text: String = doc.select(&sel).next()?.text().collect();
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Production fetcher: bounded-timeout GET, accepts only 200 + text/html.
pub struct HttpTitleFetcher {
    client: reqwest::blocking::Client,
}

impl HttpTitleFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(BROWSER_UA)
            .timeout(timeout)
            .build()
            .context("building title-fetch HTTP client")?;
        Ok(Self { client })
    }
}

impl TitleFetcher for HttpTitleFetcher {
    fn page_title(&self, url: &str) -> Option<String> {
        let resp = match self.client.get(url).send() {
            Ok(r) => r,
            Err(err) => {
                tracing::debug!(url, %err, "title fetch failed");
                return None;
            }
        };
        if resp.status() != reqwest::StatusCode::OK {
            tracing::debug!(url, status = %resp.status(), "title fetch: non-200");
            return None;
        }
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !content_type.contains("text/html") {
            return None;
        }
        let body = resp.text().ok()?;
        html_title(&body)
    }
}
