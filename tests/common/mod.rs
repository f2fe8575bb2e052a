use parking_lot::Mutex;
use snoosift::{
    CommentItem, CrawlOptions, ListingPage, ListingSource, PostItem, Record, RetryPolicy, SortOrder,
    SourceError, TitleFetcher,
};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Scripted in-memory data source. Posts are keyed by (subreddit, sort);
/// failures can be injected per listing; every listing call is recorded so
/// tests can count retries.
#[derive(Default)]
pub struct FakeSource {
    posts: HashMap<(String, SortOrder), Vec<PostItem>>,
    comments: HashMap<String, Vec<CommentItem>>,
    missing: HashSet<String>,
    forbidden: HashSet<String>,
    rate_limit_remaining: Mutex<HashMap<(String, SortOrder), u32>>,
    listing_calls: Mutex<HashMap<(String, SortOrder), usize>>,
    /// 0 means "whole listing in one page".
    page_size: usize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(mut self, n: usize) -> Self {
        self.page_size = n;
        self
    }

    pub fn add_post(&mut self, sub: &str, sort: SortOrder, post: PostItem) {
        self.posts.entry((sub.to_string(), sort)).or_default().push(post);
    }

    /// Surface the same post under every sort order, as hot/top/new/rising
    /// listings routinely do.
    pub fn add_post_all_sorts(&mut self, sub: &str, post: PostItem) {
        for sort in SortOrder::ALL {
            self.add_post(sub, sort, post.clone());
        }
    }

    pub fn add_comments(&mut self, post_id: &str, comments: Vec<CommentItem>) {
        self.comments.insert(post_id.to_string(), comments);
    }

    pub fn mark_missing(&mut self, sub: &str) {
        self.missing.insert(sub.to_string());
    }

    pub fn mark_forbidden(&mut self, sub: &str) {
        self.forbidden.insert(sub.to_string());
    }

    /// Fail the next `n` listing calls for (sub, sort) with RateLimited.
    pub fn rate_limit_first(&mut self, sub: &str, sort: SortOrder, n: u32) {
        self.rate_limit_remaining.lock().insert((sub.to_string(), sort), n);
    }

    pub fn listing_calls(&self, sub: &str, sort: SortOrder) -> usize {
        self.listing_calls
            .lock()
            .get(&(sub.to_string(), sort))
            .copied()
            .unwrap_or(0)
    }
}

impl ListingSource for FakeSource {
    fn listing_page(
        &self,
        subreddit: &str,
        sort: SortOrder,
        after: Option<&str>,
    ) -> Result<ListingPage, SourceError> {
        let key = (subreddit.to_string(), sort);
        *self.listing_calls.lock().entry(key.clone()).or_insert(0) += 1;

        if self.missing.contains(subreddit) {
            return Err(SourceError::NotFound(subreddit.to_string()));
        }
        if self.forbidden.contains(subreddit) {
            return Err(SourceError::Forbidden(subreddit.to_string()));
        }
        if let Some(remaining) = self.rate_limit_remaining.lock().get_mut(&key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SourceError::RateLimited);
            }
        }

        let all = self.posts.get(&key).cloned().unwrap_or_default();
        if self.page_size == 0 {
            return Ok(ListingPage { posts: all, after: None });
        }
        // Cursor is the start index of the next page.
        let start: usize = after.and_then(|a| a.parse().ok()).unwrap_or(0);
        let end = (start + self.page_size).min(all.len());
        let next = (end < all.len()).then(|| end.to_string());
        Ok(ListingPage { posts: all[start..end].to_vec(), after: next })
    }

    fn top_level_comments(&self, _subreddit: &str, post_id: &str) -> Result<Vec<CommentItem>, SourceError> {
        Ok(self.comments.get(post_id).cloned().unwrap_or_default())
    }
}

/// Fetcher that knows a fixed url -> title map; everything else fails.
pub struct MapTitles(pub HashMap<String, String>);

impl TitleFetcher for MapTitles {
    fn page_title(&self, url: &str) -> Option<String> {
        self.0.get(url).cloned()
    }
}

/// Fetcher that always fails, for tests where enrichment is irrelevant.
pub struct NoTitles;

impl TitleFetcher for NoTitles {
    fn page_title(&self, _url: &str) -> Option<String> {
        None
    }
}

pub fn post(id: &str, title: &str, body: &str) -> PostItem {
    PostItem {
        id: id.to_string(),
        title: title.to_string(),
        body: body.to_string(),
        author: Some("tester".to_string()),
        score: 10,
        created_utc: 1_700_000_000,
    }
}

pub fn comment(id: &str, body: &str) -> CommentItem {
    CommentItem {
        id: id.to_string(),
        body: body.to_string(),
        author: Some("replier".to_string()),
        score: 2,
        created_utc: 1_700_000_100,
    }
}

/// Options tuned for tests: no progress bar, no backoff sleeping.
pub fn test_options(dir: &Path, subs: &[&str], keywords: &[&str], target_mb: f64) -> CrawlOptions {
    CrawlOptions::default()
        .with_subreddits(subs.iter().copied())
        .with_keywords(keywords.iter().copied())
        .with_output_dir(dir)
        .with_target_mb(target_mb)
        .with_retry(RetryPolicy::immediate(4))
        .with_progress(false)
}

/// Parse every line of every chunk in `dir`, in file order. Panics on any
/// malformed line, so calling this asserts NDJSON integrity as a side effect.
pub fn read_all_records(dir: &Path) -> Vec<Record> {
    let mut paths: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == "ndjson"))
        .collect();
    paths.sort();

    let mut records = Vec::new();
    for path in paths {
        let f = File::open(&path).unwrap();
        for line in BufReader::new(f).lines() {
            let line = line.unwrap();
            if line.is_empty() {
                continue;
            }
            records.push(serde_json::from_str::<Record>(&line).unwrap());
        }
    }
    records
}

/// Sum of final chunk sizes on disk.
pub fn total_chunk_bytes(dir: &Path) -> u64 {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == "ndjson"))
        .map(|p| fs::metadata(&p).unwrap().len())
        .sum()
}
