//! # Lookup table
//! The static question→answer table backing the local match path, plus a
//! thread-safe handle that swaps the table wholesale on reload. Readers
//! always see a fully-formed table, never a partial one.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One question/answer pair. Immutable once loaded; reloads replace the
/// whole table instead of mutating entries in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LookupEntry {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Default, Clone)]
pub struct LookupTable {
    entries: Vec<LookupEntry>,
}

impl LookupTable {
    pub fn new(entries: Vec<LookupEntry>) -> Self {
        Self { entries }
    }

    /// Load the table from a JSON array of `{question, answer}` objects.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path.as_ref())?;
        let entries: Vec<LookupEntry> = serde_json::from_str(&data)?;
        info!(
            count = entries.len(),
            path = %path.as_ref().display(),
            "answer table loaded"
        );
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[LookupEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Threadsafe handle over the current table. Cloning is cheap; all clones
/// observe the same table and the same reloads.
#[derive(Clone)]
pub struct LookupHandle {
    inner: Arc<RwLock<LookupTable>>,
}

impl LookupHandle {
    pub fn new(table: LookupTable) -> Self {
        Self {
            inner: Arc::new(RwLock::new(table)),
        }
    }

    /// Run the matcher against the current table snapshot.
    pub fn find_match(&self, text: &str) -> Option<LookupEntry> {
        let guard = self.inner.read().expect("lookup table rwlock poisoned");
        crate::matcher::best_match(text, guard.entries()).cloned()
    }

    pub fn entry_count(&self) -> usize {
        self.inner.read().expect("lookup table rwlock poisoned").len()
    }

    /// Swap in a freshly loaded table atomically.
    pub fn replace(&self, table: LookupTable) {
        let mut guard = self.inner.write().expect("lookup table rwlock poisoned");
        *guard = table;
    }

    /// Reload from `path`, keeping the previous table if the file is
    /// missing or malformed.
    pub fn reload_from_file(&self, path: &Path) -> anyhow::Result<usize> {
        let fresh = LookupTable::load_from_file(path)?;
        let count = fresh.len();
        self.replace(fresh);
        Ok(count)
    }
}

/// Start a simple polling watcher on `path` to hot-reload into `handle`.
/// Polls mtime every 2s. Gated behind ANSWERS_HOT_RELOAD=1; a no-op when
/// the flag is off so production deployments pay nothing for it.
pub fn start_hot_reload_thread(handle: LookupHandle, path: PathBuf) {
    if !crate::config::AppConfig::hot_reload_requested() {
        return;
    }

    thread::spawn(move || {
        let poll = Duration::from_secs(2);
        let mut last_mtime: Option<SystemTime> = None;

        loop {
            match fs::metadata(&path).and_then(|m| m.modified()) {
                Ok(mtime) => {
                    let changed = match last_mtime {
                        None => {
                            last_mtime = Some(mtime);
                            false
                        }
                        Some(prev) => mtime > prev,
                    };
                    if changed {
                        match handle.reload_from_file(&path) {
                            Ok(count) => info!(count, "answer table hot-reloaded"),
                            Err(err) => warn!(error = %err, "answer table reload failed; keeping previous table"),
                        }
                        last_mtime = Some(mtime);
                    }
                }
                Err(_) => {
                    // File may be mid-replace; try again next tick.
                }
            }
            thread::sleep(poll);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(q: &str, a: &str) -> LookupEntry {
        LookupEntry {
            question: q.to_string(),
            answer: a.to_string(),
        }
    }

    #[test]
    fn replace_swaps_the_whole_table() {
        let handle = LookupHandle::new(LookupTable::new(vec![entry("library hours", "9-5")]));
        assert!(handle.find_match("library hours").is_some());

        handle.replace(LookupTable::new(vec![entry("gym hours", "6-10")]));
        assert!(handle.find_match("library hours").is_none());
        assert_eq!(handle.find_match("gym hours").map(|e| e.answer), Some("6-10".into()));
    }

    #[test]
    fn clones_observe_reloads() {
        let handle = LookupHandle::new(LookupTable::default());
        let other = handle.clone();
        handle.replace(LookupTable::new(vec![entry("wifi password", "ask IT")]));
        assert_eq!(other.entry_count(), 1);
    }
}
