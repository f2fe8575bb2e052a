//! Live `ListingSource` over the public Reddit JSON API, with a shared
//! requests-per-minute pacer so the worker pool stays inside one budget.

use crate::source::{CommentItem, ListingPage, ListingSource, PostItem, SortOrder, SourceError};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde_json::Value;
use std::thread;
use std::time::{Duration, Instant};

const REDDIT_BASE: &str = "https://www.reddit.com";
const PAGE_LIMIT: u32 = 100;

/// Spaces requests evenly across the budget. Workers block here before every
/// API call; sleeping under the lock is what serializes them.
struct Pacer {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Pacer {
    fn new(requests_per_min: u32) -> Self {
        let rpm = requests_per_min.max(1);
        Self {
            interval: Duration::from_secs_f64(60.0 / rpm as f64),
            last: Mutex::new(None),
        }
    }

    fn acquire(&self) {
        let mut last = self.last.lock();
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.interval {
                thread::sleep(self.interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }
}

pub struct RedditClient {
    client: reqwest::blocking::Client,
    pacer: Pacer,
    base: String,
}

impl RedditClient {
    pub fn new(requests_per_min: u32) -> Result<Self> {
        let user_agent = format!("snoosift/{} (keyword crawler)", env!("CARGO_PKG_VERSION"));
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()
            .context("building Reddit HTTP client")?;
        Ok(Self {
            client,
            pacer: Pacer::new(requests_per_min),
            base: REDDIT_BASE.to_string(),
        })
    }

    /// Point the client at a different host (local fixtures, proxies).
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    fn get_json(&self, subreddit: &str, url: &str) -> Result<Value, SourceError> {
        self.pacer.acquire();
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|err| SourceError::Transient(err.to_string()))?;
        match resp.status().as_u16() {
            200 => {}
            404 => return Err(SourceError::NotFound(subreddit.to_string())),
            403 => return Err(SourceError::Forbidden(subreddit.to_string())),
            429 => return Err(SourceError::RateLimited),
            status => return Err(SourceError::Transient(format!("unexpected status {status}"))),
        }
        resp.json::<Value>()
            .map_err(|err| SourceError::Transient(format!("malformed payload: {err}")))
    }
}

impl ListingSource for RedditClient {
    fn listing_page(
        &self,
        subreddit: &str,
        sort: SortOrder,
        after: Option<&str>,
    ) -> Result<ListingPage, SourceError> {
        let mut url = format!(
            "{}/r/{}/{}.json?raw_json=1&limit={}",
            self.base,
            subreddit,
            sort.as_str(),
            PAGE_LIMIT
        );
        if let Some(cursor) = after {
            url.push_str("&after=");
            url.push_str(cursor);
        }
        let v = self.get_json(subreddit, &url)?;
        let data = v.get("data").cloned().unwrap_or(Value::Null);
        let posts = data
            .get("children")
            .and_then(Value::as_array)
            .map(|children| {
                children
                    .iter()
                    .filter(|c| c.get("kind").and_then(Value::as_str) == Some("t3"))
                    .filter_map(|c| c.get("data").and_then(post_from_value))
                    .collect()
            })
            .unwrap_or_default();
        let after = data.get("after").and_then(Value::as_str).map(str::to_string);
        Ok(ListingPage { posts, after })
    }

    fn top_level_comments(&self, subreddit: &str, post_id: &str) -> Result<Vec<CommentItem>, SourceError> {
        // Payload is a two-element array: [post listing, comment listing].
        let url = format!(
            "{}/r/{}/comments/{}.json?raw_json=1&limit={}&depth=1",
            self.base, subreddit, post_id, PAGE_LIMIT
        );
        let v = self.get_json(subreddit, &url)?;
        let comments = v
            .get(1)
            .and_then(|listing| listing.get("data"))
            .and_then(|d| d.get("children"))
            .and_then(Value::as_array)
            .map(|children| {
                children
                    .iter()
                    .filter(|c| c.get("kind").and_then(Value::as_str) == Some("t1"))
                    .filter_map(|c| c.get("data").and_then(comment_from_value))
                    .collect()
            })
            .unwrap_or_default();
        Ok(comments)
    }
}

fn post_from_value(d: &Value) -> Option<PostItem> {
    Some(PostItem {
        id: d.get("id")?.as_str()?.to_string(),
        title: d.get("title").and_then(Value::as_str).unwrap_or_default().to_string(),
        body: d.get("selftext").and_then(Value::as_str).unwrap_or_default().to_string(),
        author: author_opt(d),
        score: d.get("score").and_then(Value::as_i64).unwrap_or(0),
        created_utc: created_opt(d),
    })
}

fn comment_from_value(d: &Value) -> Option<CommentItem> {
    Some(CommentItem {
        id: d.get("id")?.as_str()?.to_string(),
        body: d.get("body").and_then(Value::as_str).unwrap_or_default().to_string(),
        author: author_opt(d),
        score: d.get("score").and_then(Value::as_i64).unwrap_or(0),
        created_utc: created_opt(d),
    })
}

/// Deleted/removed accounts come back as placeholder strings; map to None.
fn author_opt(d: &Value) -> Option<String> {
    let author = d.get("author").and_then(Value::as_str)?;
    if author.is_empty()
        || author.eq_ignore_ascii_case("[deleted]")
        || author.eq_ignore_ascii_case("[removed]")
    {
        None
    } else {
        Some(author.to_string())
    }
}

/// created_utc arrives as a float of unix seconds.
fn created_opt(d: &Value) -> i64 {
    d.get("created_utc").and_then(Value::as_f64).unwrap_or(0.0) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn post_parsing_maps_deleted_author_to_none() {
        let d = json!({
            "id": "abc", "title": "t", "selftext": "b",
            "author": "[deleted]", "score": 3, "created_utc": 1136074600.0
        });
        let post = post_from_value(&d).unwrap();
        assert_eq!(post.id, "abc");
        assert_eq!(post.author, None);
        assert_eq!(post.created_utc, 1_136_074_600);
    }

    #[test]
    fn post_without_id_is_dropped() {
        let d = json!({"title": "no id here"});
        assert!(post_from_value(&d).is_none());
    }

    #[test]
    fn pacer_spaces_out_acquisitions() {
        let pacer = Pacer::new(6000); // 10ms interval keeps the test quick
        let start = Instant::now();
        pacer.acquire();
        pacer.acquire();
        pacer.acquire();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
