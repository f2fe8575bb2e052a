//! The listing data source: per-subreddit iteration across sort orders with
//! cursor pagination and typed error signaling.

use thiserror::Error;

/// The four listing feeds walked per subreddit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SortOrder {
    Hot,
    Top,
    New,
    Rising,
}

impl SortOrder {
    pub const ALL: [SortOrder; 4] = [SortOrder::Hot, SortOrder::Top, SortOrder::New, SortOrder::Rising];

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Hot => "hot",
            SortOrder::Top => "top",
            SortOrder::New => "new",
            SortOrder::Rising => "rising",
        }
    }
}

/// One post as surfaced by a listing, before filtering/enrichment.
#[derive(Clone, Debug)]
pub struct PostItem {
    pub id: String,
    pub title: String,
    pub body: String,
    pub author: Option<String>,
    pub score: i64,
    pub created_utc: i64,
}

/// One top-level comment under a post.
#[derive(Clone, Debug)]
pub struct CommentItem {
    pub id: String,
    pub body: String,
    pub author: Option<String>,
    pub score: i64,
    pub created_utc: i64,
}

/// A page of a listing. `after` is the cursor for the next page, `None` when
/// the listing is exhausted.
#[derive(Clone, Debug)]
pub struct ListingPage {
    pub posts: Vec<PostItem>,
    pub after: Option<String>,
}

/// Source failures, split so callers can tell recoverable-per-subreddit
/// conditions from retriable throttling.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("subreddit not found: r/{0}")]
    NotFound(String),
    #[error("subreddit forbidden: r/{0}")]
    Forbidden(String),
    #[error("rate limited by source")]
    RateLimited,
    #[error("transient source failure: {0}")]
    Transient(String),
}

/// A Reddit-like data source. Implementations must be shareable across the
/// worker pool; all calls block.
pub trait ListingSource: Send + Sync {
    /// Fetch one page of a subreddit listing under the given sort order.
    fn listing_page(
        &self,
        subreddit: &str,
        sort: SortOrder,
        after: Option<&str>,
    ) -> Result<ListingPage, SourceError>;

    /// Fetch the top-level comments of a post.
    fn top_level_comments(&self, subreddit: &str, post_id: &str) -> Result<Vec<CommentItem>, SourceError>;
}
