//! Persisted existence-only key tables.
//!
//! A compiled table is the sorted, deduplicated, lowercased key set of a
//! plaintext source list, written one key per line to `<source>.db` next to
//! the source.  The compiled file survives restarts and is opened read-only
//! by the serving path; rebuilds happen in a separate invocation and rewrite
//! the file from scratch.

use std::collections::BTreeSet;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::StoreError;

/// Extension appended to a source path to name its compiled table.
const COMPILED_EXT: &str = "db";

/// Compiled table file for the given source list (`domains` -> `domains.db`).
pub fn compiled_path(source: &Path) -> PathBuf {
    let mut name = source.as_os_str().to_os_string();
    name.push(".");
    name.push(COMPILED_EXT);
    PathBuf::from(name)
}

/// Whether a build pass rewrote the compiled table or left it alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BuildOutcome {
    /// The compiled table was rewritten; carries the number of keys.
    Rebuilt(usize),
    /// The compiled table was already newer than its source.
    Fresh,
}

/// Regenerate the compiled table for `source` unless it is already fresh.
///
/// The table is rebuilt only when `force` is set or the source is strictly
/// newer than the compiled file; a missing compiled file counts as
/// arbitrarily old.  Source lines are stripped of `#` comments, blank lines
/// are skipped, and the remainder is lowercased before insertion.  The
/// compiled file is truncated and rewritten in full.
pub fn build(source: &Path, force: bool) -> Result<BuildOutcome, StoreError> {
    let compiled = compiled_path(source);
    if !force && !is_stale(source, &compiled)? {
        debug!(table = %compiled.display(), "compiled table is fresh; skipping rebuild");
        return Ok(BuildOutcome::Fresh);
    }

    let text = fs::read_to_string(source).map_err(|e| StoreError::ReadSource {
        path: source.to_path_buf(),
        source: e,
    })?;

    // BTreeSet gives deduplication and bytewise ordering in one pass.
    let keys: BTreeSet<String> = text
        .lines()
        .filter_map(|line| {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                None
            } else {
                Some(line.to_ascii_lowercase())
            }
        })
        .collect();

    let write_err = |e| StoreError::WriteTable {
        path: compiled.clone(),
        source: e,
    };
    let file = fs::File::create(&compiled).map_err(&write_err)?;
    let mut writer = BufWriter::new(file);
    for key in &keys {
        writer.write_all(key.as_bytes()).map_err(&write_err)?;
        writer.write_all(b"\n").map_err(&write_err)?;
    }
    writer.flush().map_err(&write_err)?;

    Ok(BuildOutcome::Rebuilt(keys.len()))
}

/// A compiled table is stale when it is missing or strictly older than its
/// source.
fn is_stale(source: &Path, compiled: &Path) -> Result<bool, StoreError> {
    let source_mtime = fs::metadata(source)
        .and_then(|m| m.modified())
        .map_err(|e| StoreError::ReadSource {
            path: source.to_path_buf(),
            source: e,
        })?;
    match fs::metadata(compiled).and_then(|m| m.modified()) {
        Ok(compiled_mtime) => Ok(source_mtime > compiled_mtime),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(StoreError::OpenTable {
            path: compiled.to_path_buf(),
            source: e,
        }),
    }
}

/// An in-memory, read-only view of a compiled table.
///
/// Keys are held sorted and probed by binary search.  The builder writes
/// sorted output, but the lookup invariant must hold regardless of who wrote
/// the file, so keys are re-sorted on open.
#[derive(Debug)]
pub struct CompiledTable {
    keys: Vec<String>,
}

impl CompiledTable {
    /// Open the compiled table at `path` read-only.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let text = fs::read_to_string(path).map_err(|e| StoreError::OpenTable {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut keys: Vec<String> = text.lines().map(str::to_string).collect();
        keys.sort_unstable();
        Ok(Self { keys })
    }

    /// Exact-key existence test.  The caller lowercases probe keys.
    pub fn contains(&self, key: &str) -> bool {
        self.keys.binary_search_by(|k| k.as_str().cmp(key)).is_ok()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
