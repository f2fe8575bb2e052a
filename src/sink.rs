//! Shared chunked NDJSON sink: one lock over seen-set, current chunk, and
//! byte counters. Chunks are written under a staging name and atomically
//! promoted, so downstream readers only ever see complete files.

use crate::record::Record;
use ahash::AHashSet;
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

const STAGING_DIR: &str = "_staging";
const CHUNK_PREFIX: &str = "records_";
const CHUNK_EXT: &str = ".ndjson";

/// Totals for a finished run. Bytes and records count this run only, not
/// whatever was already in the output directory.
#[derive(Clone, Copy, Debug)]
pub struct SinkSummary {
    pub records: u64,
    pub bytes: u64,
    pub chunks: u32,
}

struct SinkState {
    seen: AHashSet<String>,
    writer: Option<BufWriter<File>>,
    staged_path: PathBuf,
    chunk_index: u32,
    chunk_bytes: u64,
    chunks_finalized: u32,
}

/// Thread-safe accumulator shared by all workers. Dedup claims and record
/// submission are the only mutations; counters are read-only to callers.
pub struct ChunkedSink {
    dir: PathBuf,
    staging: PathBuf,
    chunk_limit: u64,
    target: u64,
    write_buf: usize,
    stop: AtomicBool,
    total_bytes: AtomicU64,
    total_records: AtomicU64,
    bar: Option<ProgressBar>,
    state: Mutex<SinkState>,
}

impl ChunkedSink {
    /// Open a sink over `dir`, creating it if needed. Identifiers found in
    /// existing chunks seed the seen-set so a re-run into the same directory
    /// resumes without duplicates; chunk numbering continues past them.
    pub fn create(dir: &Path, chunk_bytes: u64, target_bytes: u64, write_buf: usize) -> Result<Self> {
        fs::create_dir_all(dir).with_context(|| format!("creating output dir {}", dir.display()))?;
        let staging = dir.join(STAGING_DIR);
        fs::create_dir_all(&staging)?;
        clear_stale_staging(&staging)?;

        let mut seen = AHashSet::new();
        let chunk_index = seed_from_existing(dir, &mut seen)?;
        if !seen.is_empty() {
            tracing::info!(ids = seen.len(), "seeded dedup set from existing chunks");
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            staging,
            chunk_limit: chunk_bytes,
            target: target_bytes,
            write_buf: write_buf.max(8 * 1024),
            stop: AtomicBool::new(false),
            total_bytes: AtomicU64::new(0),
            total_records: AtomicU64::new(0),
            bar: None,
            state: Mutex::new(SinkState {
                seen,
                writer: None,
                staged_path: PathBuf::new(),
                chunk_index,
                chunk_bytes: 0,
                chunks_finalized: 0,
            }),
        })
    }

    /// Attach an optional progress bar incremented per byte written.
    pub fn with_progress(mut self, bar: Option<ProgressBar>) -> Self {
        self.bar = bar;
        self
    }

    /// Atomically claim an identifier. Returns false when it was already
    /// claimed this run (or found in pre-existing output).
    pub fn try_insert(&self, id: &str) -> bool {
        self.state.lock().seen.insert(id.to_string())
    }

    /// Append one record to the current chunk, rotating when the chunk
    /// threshold is met. Returns whether the global target has now been
    /// reached. I/O failures here are fatal to the run.
    pub fn submit(&self, rec: &Record) -> Result<bool> {
        let mut line = serde_json::to_string(rec).context("serializing record")?;
        line.push('\n');

        let mut guard = self.state.lock();
        let st = &mut *guard;
        if st.writer.is_none() {
            let staged = self
                .staging
                .join(format!("{}{:04}.inprogress", CHUNK_PREFIX, st.chunk_index));
            let f = File::create(&staged).with_context(|| format!("creating chunk {}", staged.display()))?;
            st.staged_path = staged;
            st.writer = Some(BufWriter::with_capacity(self.write_buf, f));
        }
        if let Some(w) = st.writer.as_mut() {
            w.write_all(line.as_bytes())
                .with_context(|| format!("writing chunk {}", st.staged_path.display()))?;
        }

        let n = line.len() as u64;
        st.chunk_bytes += n;
        let total = self.total_bytes.fetch_add(n, Ordering::Relaxed) + n;
        self.total_records.fetch_add(1, Ordering::Relaxed);
        if let Some(bar) = &self.bar {
            bar.inc(n);
        }

        if st.chunk_bytes >= self.chunk_limit {
            self.rotate(st)?;
        }

        let reached = total >= self.target;
        if reached {
            self.stop.store(true, Ordering::Release);
        }
        Ok(reached)
    }

    /// True once the cumulative target is met or a fatal error requested a
    /// stop. Workers poll this between pages, sort orders, and subreddits.
    pub fn target_reached(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Raise the stop flag without reaching the target (fatal-error path).
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn bytes_written(&self) -> u64 {
        self.total_bytes.load(Ordering::Relaxed)
    }

    pub fn records_written(&self) -> u64 {
        self.total_records.load(Ordering::Relaxed)
    }

    /// Flush and promote the final partial chunk, returning run totals.
    pub fn finish(self) -> Result<SinkSummary> {
        let chunks = {
            let mut guard = self.state.lock();
            let st = &mut *guard;
            if st.chunk_bytes > 0 {
                self.rotate(st)?;
            } else if st.writer.take().is_some() {
                // Open but empty: drop the staged file instead of promoting it.
                let _ = fs::remove_file(&st.staged_path);
            }
            st.chunks_finalized
        };
        Ok(SinkSummary {
            records: self.total_records.load(Ordering::Relaxed),
            bytes: self.total_bytes.load(Ordering::Relaxed),
            chunks,
        })
    }

    fn rotate(&self, st: &mut SinkState) -> Result<()> {
        let Some(mut w) = st.writer.take() else {
            return Ok(());
        };
        w.flush()
            .with_context(|| format!("flushing chunk {}", st.staged_path.display()))?;
        drop(w);

        let final_path = self
            .dir
            .join(format!("{}{:04}{}", CHUNK_PREFIX, st.chunk_index, CHUNK_EXT));
        fs::rename(&st.staged_path, &final_path).with_context(|| {
            format!("promoting chunk {} -> {}", st.staged_path.display(), final_path.display())
        })?;
        tracing::info!(chunk = %final_path.display(), bytes = st.chunk_bytes, "chunk finalized");

        st.chunk_index += 1;
        st.chunk_bytes = 0;
        st.chunks_finalized += 1;
        Ok(())
    }
}

/// Remove leftover `.inprogress` files from a crashed run.
fn clear_stale_staging(staging: &Path) -> Result<()> {
    for entry in fs::read_dir(staging)? {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == "inprogress") {
            let _ = fs::remove_file(&path);
        }
    }
    Ok(())
}

/// Collect ids from every existing chunk and return the next free chunk
/// index. Malformed lines are skipped, matching the NDJSON read discipline.
fn seed_from_existing(dir: &Path, seen: &mut AHashSet<String>) -> Result<u32> {
    let mut next_index = 0u32;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.ends_with(CHUNK_EXT) {
            continue;
        }
        if let Some(idx) = name
            .strip_prefix(CHUNK_PREFIX)
            .and_then(|r| r.strip_suffix(CHUNK_EXT))
            .and_then(|r| r.parse::<u32>().ok())
        {
            next_index = next_index.max(idx + 1);
        }
        let f = File::open(&path).with_context(|| format!("opening {}", path.display()))?;
        for line in BufReader::new(f).lines() {
            let line = line.with_context(|| format!("reading {}", path.display()))?;
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(v) = serde_json::from_str::<serde_json::Value>(&line) {
                if let Some(id) = v.get("id").and_then(|x| x.as_str()) {
                    seen.insert(id.to_string());
                }
            }
        }
    }
    Ok(next_index)
}
