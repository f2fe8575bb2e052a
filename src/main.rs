use anyhow::Result;
use clap::Parser;
use snoosift::{init_tracing_once, mb, read_list_file, run, CrawlOptions, HttpTitleFetcher, RedditClient};
use std::path::PathBuf;

/// Crawl Reddit for keyword-matching posts and comments, writing size-rotated
/// NDJSON chunks until the target amount of data has been collected.
#[derive(Parser, Debug)]
#[command(name = "snoosift", version, about)]
struct Args {
    /// File listing subreddits to crawl, one per line (no leading r/).
    subreddits_file: PathBuf,
    /// File listing case-insensitive keyword substrings, one per line.
    keywords_file: PathBuf,
    /// Directory for NDJSON chunk output.
    output_dir: PathBuf,
    /// Target data size in megabytes.
    target_size_mb: f64,
    /// Requests-per-minute budget against the Reddit API.
    #[arg(long, default_value_t = 60)]
    requests_per_min: u32,
    /// Disable the progress bar.
    #[arg(long)]
    no_progress: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing_once();

    let subreddits = read_list_file(&args.subreddits_file)?;
    let keywords = read_list_file(&args.keywords_file)?;

    let opts = CrawlOptions::default()
        .with_subreddits(subreddits)
        .with_keywords(keywords)
        .with_output_dir(&args.output_dir)
        .with_target_mb(args.target_size_mb)
        .with_progress(!args.no_progress);

    let source = RedditClient::new(args.requests_per_min)?;
    let titles = HttpTitleFetcher::new(opts.fetch_timeout)?;

    let report = run(&opts, &source, &titles)?;

    println!(
        "Wrote {} records ({:.2} MB) across {} chunks in {} passes",
        report.records,
        mb(report.bytes_written),
        report.chunks,
        report.passes
    );
    if !report.skipped.is_empty() {
        println!("Skipped subreddits: {}", report.skipped.join(", "));
    }
    Ok(())
}
