use crate::retry::RetryPolicy;
use anyhow::{ensure, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct CrawlOptions {
    pub subreddits: Vec<String>,      // normalized, no "r/"
    pub keywords: Vec<String>,        // case-insensitive substrings
    pub output_dir: PathBuf,
    pub target_bytes: u64,            // run stops once this much is written
    pub chunk_bytes: u64,             // rotation threshold per output file
    pub fetch_timeout: Duration,      // per-URL budget for title enrichment
    pub retry: RetryPolicy,           // listing-page backoff on rate limits
    pub progress: bool,               // show progress bar
    pub write_buffer_bytes: usize,    // BufWriter capacity for chunk files
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            subreddits: Vec::new(),
            keywords: Vec::new(),
            output_dir: PathBuf::from("reddit_data"),
            target_bytes: 0,
            chunk_bytes: 10 * 1024 * 1024,
            fetch_timeout: Duration::from_secs(15),
            retry: RetryPolicy::default(),
            progress: true,
            write_buffer_bytes: 256 * 1024,
        }
    }
}

impl CrawlOptions {
    pub fn with_subreddits<I, S>(mut self, subs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.subreddits = subs
            .into_iter()
            .map(|s| normalize_subreddit(s.as_ref()))
            .filter(|s| !s.is_empty())
            .collect();
        self
    }
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }
    pub fn with_output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }
    /// Target size given in megabytes, as on the command line.
    pub fn with_target_mb(mut self, mb: f64) -> Self {
        self.target_bytes = if mb > 0.0 { (mb * 1024.0 * 1024.0) as u64 } else { 0 };
        self
    }
    pub fn with_target_bytes(mut self, bytes: u64) -> Self {
        self.target_bytes = bytes;
        self
    }
    pub fn with_chunk_bytes(mut self, bytes: u64) -> Self {
        self.chunk_bytes = bytes;
        self
    }
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_write_buffer(mut self, bytes: usize) -> Self {
        self.write_buffer_bytes = bytes.max(8 * 1024);
        self
    }

    /// Fail-fast configuration check, run before any worker starts.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.subreddits.is_empty(), "no subreddits configured");
        ensure!(!self.keywords.is_empty(), "no keywords configured");
        ensure!(self.target_bytes > 0, "target size must be positive");
        ensure!(self.chunk_bytes > 0, "chunk size must be positive");
        Ok(())
    }
}

fn normalize_subreddit(name: &str) -> String {
    let s = name.trim();
    let s = s.strip_prefix("r/").unwrap_or(s);
    s.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> CrawlOptions {
        CrawlOptions::default()
            .with_subreddits(["rust"])
            .with_keywords(["borrow"])
            .with_target_mb(1.0)
    }

    #[test]
    fn valid_options_pass() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn empty_subreddits_rejected() {
        let opts = valid().with_subreddits(Vec::<String>::new());
        assert!(opts.validate().unwrap_err().to_string().contains("subreddits"));
    }

    #[test]
    fn non_positive_target_rejected() {
        let opts = valid().with_target_mb(0.0);
        assert!(opts.validate().unwrap_err().to_string().contains("target"));
        let opts = valid().with_target_mb(-3.5);
        assert!(opts.validate().is_err());
    }

    #[test]
    fn subreddit_names_are_normalized() {
        let opts = CrawlOptions::default().with_subreddits(["r/rust", "  python ", ""]);
        assert_eq!(opts.subreddits, vec!["rust", "python"]);
    }
}
