//! Durable progress ledger enforcing at-most-once lesson processing.
//!
//! The ledger is a plain append-only, newline-delimited list of processed
//! URLs, mirrored by an in-memory set. It is human-readable and diff-friendly;
//! duplicate lines in the log are harmless because membership is a set.
//!
//! Membership is monotonic: an entry, once added, is never removed, within a
//! run or across runs.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use lessonforge_shared::{LessonForgeError, Result};

/// Durable record of processed lesson URLs.
///
/// One instance is constructed at startup and handed by reference into every
/// crawl task; the set and the log file are guarded by a single mutex so
/// concurrent `add` calls never interleave a read-modify-write.
pub struct ProgressLedger {
    path: PathBuf,
    inner: Mutex<LedgerInner>,
}

struct LedgerInner {
    processed: HashSet<String>,
    log: File,
}

impl ProgressLedger {
    /// Open the ledger at `path`, creating it if absent, and replay the log
    /// into memory. Performed once at process start.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| LessonForgeError::io(parent, e))?;
            }
        }

        let mut processed = HashSet::new();
        if path.exists() {
            let file = File::open(path).map_err(|e| LessonForgeError::io(path, e))?;
            for line in BufReader::new(file).lines() {
                let line = line.map_err(|e| LessonForgeError::io(path, e))?;
                let url = line.trim();
                if !url.is_empty() {
                    processed.insert(url.to_string());
                }
            }
        }

        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| LessonForgeError::io(path, e))?;

        tracing::debug!(path = %path.display(), entries = processed.len(), "ledger loaded");

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(LedgerInner { processed, log }),
        })
    }

    /// Whether `url` has already been processed.
    pub fn contains(&self, url: &str) -> bool {
        let inner = self.inner.lock().expect("ledger lock poisoned");
        inner.processed.contains(url)
    }

    /// Mark `url` processed. Idempotent: a URL already present is not
    /// appended again. The in-memory insert and the durable append happen
    /// under one exclusive lock.
    pub fn add(&self, url: &str) -> Result<()> {
        let mut inner = self.inner.lock().expect("ledger lock poisoned");
        if !inner.processed.insert(url.to_string()) {
            return Ok(());
        }
        writeln!(inner.log, "{url}").map_err(|e| LessonForgeError::io(&self.path, e))?;
        inner.log.flush().map_err(|e| LessonForgeError::io(&self.path, e))?;
        Ok(())
    }

    /// Number of processed URLs.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().expect("ledger lock poisoned");
        inner.processed.len()
    }

    /// Whether the ledger is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_in(dir: &Path) -> ProgressLedger {
        ProgressLedger::open(&dir.join("processed.txt")).expect("open ledger")
    }

    #[test]
    fn add_then_contains() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(dir.path());

        assert!(!ledger.contains("https://example.com/a"));
        ledger.add("https://example.com/a").unwrap();
        assert!(ledger.contains("https://example.com/a"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn add_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed.txt");
        let ledger = ProgressLedger::open(&path).unwrap();

        ledger.add("https://example.com/a").unwrap();
        ledger.add("https://example.com/a").unwrap();
        assert_eq!(ledger.len(), 1);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn membership_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed.txt");

        {
            let ledger = ProgressLedger::open(&path).unwrap();
            ledger.add("https://example.com/a").unwrap();
            ledger.add("https://example.com/b").unwrap();
        }

        let reopened = ProgressLedger::open(&path).unwrap();
        assert!(reopened.contains("https://example.com/a"));
        assert!(reopened.contains("https://example.com/b"));
        assert_eq!(reopened.len(), 2);
    }

    #[test]
    fn duplicate_log_lines_collapse_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed.txt");
        std::fs::write(
            &path,
            "https://example.com/a\nhttps://example.com/a\n\nhttps://example.com/b\n",
        )
        .unwrap();

        let ledger = ProgressLedger::open(&path).unwrap();
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn concurrent_adds_never_lose_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed.txt");
        let ledger = std::sync::Arc::new(ProgressLedger::open(&path).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ledger = ledger.clone();
                std::thread::spawn(move || {
                    for j in 0..50 {
                        ledger.add(&format!("https://example.com/{i}/{j}")).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(ledger.len(), 400);
        let reopened = ProgressLedger::open(&path).unwrap();
        assert_eq!(reopened.len(), 400);
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deep/processed.txt");
        let ledger = ProgressLedger::open(&path).unwrap();
        ledger.add("https://example.com/a").unwrap();
        assert!(path.exists());
    }
}
