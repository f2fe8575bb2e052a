//! Newline-list input files: one entry per line, blank lines ignored.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Read a list file (subreddits or keywords). Lines are trimmed; blank lines
/// are skipped. Missing files are a configuration error.
pub fn read_list_file(path: &Path) -> Result<Vec<String>> {
    let f = File::open(path).with_context(|| format!("opening list file {}", path.display()))?;
    let r = BufReader::new(f);
    let mut out = Vec::new();
    for line in r.lines() {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        let entry = line.trim();
        if entry.is_empty() {
            continue;
        }
        out.push(entry.to_string());
    }
    Ok(out)
}
