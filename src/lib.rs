mod config;
mod inputs;
mod record;
mod filters;
mod retry;

mod source;
mod reddit;
mod enrich;

mod sink;
mod collector;
mod dispatcher;

mod progress;
mod util;

pub use crate::config::CrawlOptions;
pub use crate::record::{Link, Record, RecordKind};
pub use crate::filters::KeywordSet;
pub use crate::retry::RetryPolicy;

// Data-source interface and the live Reddit implementation.
pub use crate::source::{CommentItem, ListingPage, ListingSource, PostItem, SortOrder, SourceError};
pub use crate::reddit::RedditClient;

// Link enrichment: URL extraction and page-title fetching.
pub use crate::enrich::{enrich_links, extract_urls, html_title, HttpTitleFetcher, TitleFetcher};

// Shared chunked output sink.
pub use crate::sink::{ChunkedSink, SinkSummary};

// Per-subreddit collector and the run dispatcher.
pub use crate::collector::{Collector, SubredditOutcome};
pub use crate::dispatcher::{run, CrawlReport};

// List-file loading for the binary and for embedding callers.
pub use crate::inputs::read_list_file;

// Expose tracing init and byte helpers so binaries can import from crate root.
pub use crate::util::{init_tracing_once, mb};
