//! Completion ledger: which documents a directory has already submitted.
//!
//! One append-only `solrcomplete.txt` per record directory, one document key
//! per line. The ledger only grows; there is no compaction. Membership is
//! answered against the file's current contents, not a stale snapshot, so
//! concurrent appends from an earlier phase of the same run are observed.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{PipelineError, Result};

/// Ledger file name, one per record directory.
pub const LEDGER_FILE: &str = "solrcomplete.txt";

pub struct Ledger {
    path: PathBuf,
    seen: HashSet<String>,
}

impl Ledger {
    /// Open (or start) the ledger for a record directory.
    pub fn open(dir: &Path) -> Result<Self> {
        let mut ledger = Self {
            path: dir.join(LEDGER_FILE),
            seen: HashSet::new(),
        };
        ledger.reload()?;
        Ok(ledger)
    }

    /// Re-read the ledger file from disk into the line set.
    fn reload(&mut self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let content =
            fs::read_to_string(&self.path).map_err(|e| PipelineError::io(&self.path, e))?;
        self.seen = content.lines().map(str::to_string).collect();
        Ok(())
    }

    /// Whether `key` has been confirmed submitted. Revalidates against disk
    /// before answering — the file can grow between calls within one run and
    /// across runs.
    pub fn is_complete(&mut self, key: &str) -> Result<bool> {
        if !self.seen.contains(key) {
            self.reload()?;
        }
        Ok(self.seen.contains(key))
    }

    /// Record `key` as submitted. Call only after the index confirmed
    /// success, never speculatively.
    pub fn mark_complete(&mut self, key: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| PipelineError::io(&self.path, e))?;
        writeln!(file, "{key}").map_err(|e| PipelineError::io(&self.path, e))?;
        self.seen.insert(key.to_string());
        debug!("marked {} complete in {}", key, self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
