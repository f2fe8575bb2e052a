//! Run orchestration: validate options, size the worker pool, distribute
//! subreddits, and loop passes until the byte target is met or a pass makes
//! no progress.

use crate::collector::{Collector, SubredditOutcome};
use crate::config::CrawlOptions;
use crate::enrich::TitleFetcher;
use crate::filters::KeywordSet;
use crate::progress::bytes_bar;
use crate::sink::ChunkedSink;
use crate::source::ListingSource;
use crate::util::mb;
use anyhow::{ensure, Context, Result};
use parking_lot::Mutex;
use rayon::prelude::*;

/// Worker pool cap. Tunable here, not via options; the pool never exceeds
/// the subreddit count.
const WORKER_POOL_SIZE: usize = 5;

/// Totals for a finished run.
#[derive(Debug)]
pub struct CrawlReport {
    pub records: u64,
    pub bytes_written: u64,
    pub chunks: u32,
    pub passes: u32,
    pub skipped: Vec<String>,
}

/// Crawl every configured subreddit until `target_bytes` have been written
/// or the source is exhausted. Per-subreddit failures are logged and
/// skipped; only configuration and sink I/O errors surface here.
pub fn run(opts: &CrawlOptions, source: &dyn ListingSource, titles: &dyn TitleFetcher) -> Result<CrawlReport> {
    opts.validate()?;
    let keywords = KeywordSet::new(&opts.keywords);
    ensure!(!keywords.is_empty(), "keyword list contains no usable entries");

    let bar = opts.progress.then(|| bytes_bar(opts.target_bytes, "crawling"));
    let sink = ChunkedSink::create(&opts.output_dir, opts.chunk_bytes, opts.target_bytes, opts.write_buffer_bytes)?
        .with_progress(bar.clone());

    let workers = WORKER_POOL_SIZE.min(opts.subreddits.len()).max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("building worker pool")?;
    tracing::info!(
        subreddits = opts.subreddits.len(),
        keywords = keywords.len(),
        workers,
        target_mb = mb(opts.target_bytes),
        "crawl starting"
    );

    let skipped = Mutex::new(Vec::new());
    let collector = Collector::new(source, titles, &keywords, &sink, opts.retry.clone());
    let crawl_result = run_passes(&pool, opts, &collector, &sink, &skipped);
    drop(collector);

    // Finalize even when a pass failed, so already-written data is promoted.
    let summary = sink.finish();
    if let Some(bar) = &bar {
        bar.finish_with_message("crawl done");
    }
    let passes = crawl_result?;
    let summary = summary?;

    let mut skipped = skipped.into_inner();
    skipped.sort();
    skipped.dedup();

    tracing::info!(
        records = summary.records,
        written_mb = mb(summary.bytes),
        chunks = summary.chunks,
        passes,
        "crawl finished"
    );
    Ok(CrawlReport {
        records: summary.records,
        bytes_written: summary.bytes,
        chunks: summary.chunks,
        passes,
        skipped,
    })
}

/// Pass loop: each pass distributes the whole subreddit list over the pool.
/// Listings shift between passes, so re-walking them can surface new posts;
/// a pass that emits nothing means the source is exhausted.
fn run_passes(
    pool: &rayon::ThreadPool,
    opts: &CrawlOptions,
    collector: &Collector<'_>,
    sink: &ChunkedSink,
    skipped: &Mutex<Vec<String>>,
) -> Result<u32> {
    let mut passes = 0u32;
    loop {
        passes += 1;
        let records_before = sink.records_written();

        pool.install(|| {
            opts.subreddits.par_iter().try_for_each(|sub| -> Result<()> {
                if sink.target_reached() {
                    return Ok(());
                }
                match collector.crawl_subreddit(sub) {
                    Ok(SubredditOutcome::Completed { emitted }) => {
                        tracing::info!(subreddit = %sub, emitted, "subreddit walked");
                        Ok(())
                    }
                    Ok(SubredditOutcome::Skipped { why }) => {
                        tracing::warn!(subreddit = %sub, %why, "skipping subreddit");
                        skipped.lock().push(sub.clone());
                        Ok(())
                    }
                    Ok(SubredditOutcome::Stopped { emitted }) => {
                        tracing::info!(subreddit = %sub, emitted, "stopped at target");
                        Ok(())
                    }
                    Err(err) => {
                        // Fatal (sink I/O): stop siblings, surface the error.
                        sink.request_stop();
                        Err(err.context(format!("crawling r/{sub}")))
                    }
                }
            })
        })?;

        if sink.target_reached() {
            return Ok(passes);
        }
        if sink.records_written() == records_before {
            tracing::info!(pass = passes, "no new records this pass, source exhausted");
            return Ok(passes);
        }
        tracing::info!(
            pass = passes,
            written_mb = mb(sink.bytes_written()),
            "target not reached, starting another pass"
        );
    }
}
