//! Read-timestamp ledger
//!
//! Records, per absolute path, the modification time observed at the most
//! recent successful read (or write). Edits and overwrites consult it to make
//! sure the model is not acting on a stale view of the file.
//!
//! Every path also has an async lock. Callers hold it across
//! validate → persist → record so that no other task can observe a file that
//! was written while its ledger entry still carries the old timestamp.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct ReadLedger {
    timestamps: DashMap<PathBuf, SystemTime>,
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl ReadLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the per-path lock. The guard is owned so it can be held across
    /// `.await` points.
    pub async fn lock(&self, path: &Path) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    /// Record the mtime observed for `path`
    pub fn record(&self, path: &Path, mtime: SystemTime) {
        self.timestamps.insert(path.to_path_buf(), mtime);
    }

    /// Last recorded mtime, if the path was ever read
    pub fn get(&self, path: &Path) -> Option<SystemTime> {
        self.timestamps.get(path).map(|entry| *entry)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.timestamps.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Current on-disk modification time
pub async fn file_mtime(path: &Path) -> std::io::Result<SystemTime> {
    tokio::fs::metadata(path).await?.modified()
}
