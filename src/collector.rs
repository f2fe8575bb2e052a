//! Per-subreddit crawl: walk every sort order's listing, filter by keyword,
//! claim ids globally, enrich links, and emit records to the shared sink.
//! Recoverable conditions come back as values; only sink I/O is an `Err`.

use crate::enrich::{enrich_links, TitleFetcher};
use crate::filters::KeywordSet;
use crate::record::{Record, RecordKind};
use crate::retry::RetryPolicy;
use crate::sink::ChunkedSink;
use crate::source::{ListingSource, PostItem, SortOrder, SourceError};
use anyhow::Result;
use std::thread;

/// How one subreddit pass ended.
#[derive(Debug)]
pub enum SubredditOutcome {
    /// Every sort order walked to exhaustion.
    Completed { emitted: usize },
    /// The subreddit itself is unusable (not found, private); skip it.
    Skipped { why: SourceError },
    /// The global target was reached mid-crawl; the worker bailed out after
    /// finishing its current listing page.
    Stopped { emitted: usize },
}

enum ListingEnd {
    Exhausted,
    SubredditGone(SourceError),
    TargetReached,
}

pub struct Collector<'a> {
    source: &'a dyn ListingSource,
    titles: &'a dyn TitleFetcher,
    keywords: &'a KeywordSet,
    sink: &'a ChunkedSink,
    retry: RetryPolicy,
}

impl<'a> Collector<'a> {
    pub fn new(
        source: &'a dyn ListingSource,
        titles: &'a dyn TitleFetcher,
        keywords: &'a KeywordSet,
        sink: &'a ChunkedSink,
        retry: RetryPolicy,
    ) -> Self {
        Self { source, titles, keywords, sink, retry }
    }

    /// Crawl one subreddit across all sort orders.
    pub fn crawl_subreddit(&self, subreddit: &str) -> Result<SubredditOutcome> {
        let mut emitted = 0usize;
        for sort in SortOrder::ALL {
            if self.sink.target_reached() {
                return Ok(SubredditOutcome::Stopped { emitted });
            }
            match self.walk_listing(subreddit, sort, &mut emitted)? {
                ListingEnd::Exhausted => {}
                ListingEnd::SubredditGone(why) => return Ok(SubredditOutcome::Skipped { why }),
                ListingEnd::TargetReached => return Ok(SubredditOutcome::Stopped { emitted }),
            }
        }
        Ok(SubredditOutcome::Completed { emitted })
    }

    /// Walk one sort order's listing page by page. Retry-budget exhaustion
    /// abandons this sort order only; the caller moves on to the next.
    fn walk_listing(&self, subreddit: &str, sort: SortOrder, emitted: &mut usize) -> Result<ListingEnd> {
        let mut after: Option<String> = None;
        loop {
            let page = match self.page_with_retry(subreddit, sort, after.as_deref()) {
                Ok(page) => page,
                Err(why @ (SourceError::NotFound(_) | SourceError::Forbidden(_))) => {
                    return Ok(ListingEnd::SubredditGone(why));
                }
                Err(why) => {
                    tracing::warn!(subreddit, sort = sort.as_str(), %why, "abandoning sort order");
                    return Ok(ListingEnd::Exhausted);
                }
            };
            for post in &page.posts {
                self.process_post(subreddit, post, emitted)?;
            }
            // Stop only at page boundaries: overshoot is bounded to one
            // in-flight page per worker.
            if self.sink.target_reached() {
                return Ok(ListingEnd::TargetReached);
            }
            after = page.after;
            if after.is_none() || page.posts.is_empty() {
                return Ok(ListingEnd::Exhausted);
            }
        }
    }

    /// Fetch one listing page, backing off on throttling up to the retry
    /// budget. Not-found/forbidden are never retried.
    fn page_with_retry(
        &self,
        subreddit: &str,
        sort: SortOrder,
        after: Option<&str>,
    ) -> Result<crate::source::ListingPage, SourceError> {
        let mut attempt = 0u32;
        loop {
            match self.source.listing_page(subreddit, sort, after) {
                Ok(page) => return Ok(page),
                Err(why @ (SourceError::RateLimited | SourceError::Transient(_))) => {
                    attempt += 1;
                    if attempt >= self.retry.max_attempts {
                        return Err(why);
                    }
                    let delay = self.retry.delay_for(attempt);
                    tracing::debug!(
                        subreddit,
                        sort = sort.as_str(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        %why,
                        "backing off"
                    );
                    thread::sleep(delay);
                }
                Err(why) => return Err(why),
            }
        }
    }

    /// Filter, claim, enrich, and emit one post, then its top-level comments
    /// under the same rules. A comment-fetch failure skips only the comments.
    fn process_post(&self, subreddit: &str, post: &PostItem, emitted: &mut usize) -> Result<()> {
        if !self.keywords.matches(Some(&post.title), &post.body) {
            return Ok(());
        }
        if !self.sink.try_insert(&post.id) {
            return Ok(());
        }

        let links = enrich_links(&post.body, self.titles);
        let rec = Record {
            id: post.id.clone(),
            kind: RecordKind::Post,
            subreddit: subreddit.to_string(),
            title: Some(post.title.clone()),
            body: post.body.clone(),
            author: post.author.clone(),
            score: post.score,
            created_utc: post.created_utc,
            links,
            parent_id: None,
        };
        self.sink.submit(&rec)?;
        *emitted += 1;

        let comments = match self.source.top_level_comments(subreddit, &post.id) {
            Ok(comments) => comments,
            Err(why) => {
                tracing::debug!(subreddit, post = %post.id, %why, "skipping comments");
                return Ok(());
            }
        };
        for comment in comments {
            if !self.keywords.matches(None, &comment.body) {
                continue;
            }
            if !self.sink.try_insert(&comment.id) {
                continue;
            }
            let links = enrich_links(&comment.body, self.titles);
            let rec = Record {
                id: comment.id,
                kind: RecordKind::Comment,
                subreddit: subreddit.to_string(),
                title: None,
                body: comment.body,
                author: comment.author,
                score: comment.score,
                created_utc: comment.created_utc,
                links,
                parent_id: Some(post.id.clone()),
            };
            self.sink.submit(&rec)?;
            *emitted += 1;
        }
        Ok(())
    }
}
