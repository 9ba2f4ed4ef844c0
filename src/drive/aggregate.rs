//! Aggregation orchestrator: per-folder recursive counts under a bounded pool.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::counter::RecursiveCounter;
use super::entry::StoreEntry;
use crate::error::ErrorKind;
use crate::DriveError;

/// Default number of folders counted at once.
pub const DEFAULT_POOL_SIZE: usize = 5;

/// Outcome of counting one folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountResult {
    /// Folder prefix that was counted.
    pub prefix: String,
    /// Files found; always 0 when `error` is set.
    pub total_files: u64,
    /// Why the count failed, if it did.
    pub error: Option<ErrorKind>,
}

impl CountResult {
    /// A successful count.
    pub fn ok(prefix: impl Into<String>, total_files: u64) -> Self {
        Self {
            prefix: prefix.into(),
            total_files,
            error: None,
        }
    }

    /// A failed count.
    pub fn failed(prefix: impl Into<String>, error: ErrorKind) -> Self {
        Self {
            prefix: prefix.into(),
            total_files: 0,
            error: Some(error),
        }
    }

    /// Whether the count succeeded.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-folder results of one aggregation, keyed by folder key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderCounts {
    results: HashMap<String, CountResult>,
}

impl FolderCounts {
    /// Result for a folder key.
    pub fn get(&self, key: &str) -> Option<&CountResult> {
        self.results.get(key)
    }

    /// Number of folders in the mapping.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether the mapping is empty.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Iterate over `(folder key, result)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &CountResult)> {
        self.results.iter()
    }

    /// Results that carry an error.
    pub fn failed(&self) -> impl Iterator<Item = &CountResult> {
        self.results.values().filter(|r| !r.is_ok())
    }

    /// Whether at least one folder failed to count.
    pub fn is_partial_failure(&self) -> bool {
        self.failed().next().is_some()
    }

    fn insert(&mut self, key: String, result: CountResult) {
        self.results.insert(key, result);
    }
}

impl IntoIterator for FolderCounts {
    type Item = (String, CountResult);
    type IntoIter = std::collections::hash_map::IntoIter<String, CountResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

/// Runs one recursive count per folder with at most `pool_size` in flight.
#[derive(Clone)]
pub struct Aggregator {
    counter: Arc<RecursiveCounter>,
    pool_size: usize,
}

impl Aggregator {
    /// Create an aggregator. A pool size of zero is raised to one.
    pub fn new(counter: Arc<RecursiveCounter>, pool_size: usize) -> Self {
        Self {
            counter,
            pool_size: pool_size.max(1),
        }
    }

    /// Maximum number of concurrent counting jobs.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Count every folder among `entries`.
    ///
    /// Files are ignored and duplicate folder keys are counted once. Every
    /// folder ends up in the result: one failing folder never hides the
    /// others.
    pub async fn count_all_folders(&self, entries: &[StoreEntry]) -> FolderCounts {
        self.count_all_folders_with_cancel(entries, &CancellationToken::new())
            .await
    }

    /// Like [`count_all_folders`](Self::count_all_folders), stopping new store
    /// calls once `cancel` fires. Jobs that had not started settle as
    /// [`ErrorKind::Cancelled`].
    pub async fn count_all_folders_with_cancel(
        &self,
        entries: &[StoreEntry],
        cancel: &CancellationToken,
    ) -> FolderCounts {
        let mut seen = HashSet::new();
        let folders: Vec<String> = entries
            .iter()
            .filter(|e| e.is_folder())
            .filter(|e| seen.insert(e.key.clone()))
            .map(|e| e.key.clone())
            .collect();

        let mut counts = FolderCounts::default();
        if folders.is_empty() {
            return counts;
        }

        debug!(
            "Counting {} folders with pool size {}",
            folders.len(),
            self.pool_size
        );

        let semaphore = Arc::new(Semaphore::new(self.pool_size));
        let mut jobs = JoinSet::new();

        for key in &folders {
            let counter = self.counter.clone();
            let semaphore = semaphore.clone();
            let cancel = cancel.clone();
            let prefix = key.clone();

            jobs.spawn(async move {
                let permit = tokio::select! {
                    permit = semaphore.acquire_owned() => permit,
                    _ = cancel.cancelled() => return (prefix, Err(DriveError::Cancelled)),
                };
                let result = match permit {
                    Ok(_permit) => counter.count_files_with_cancel(&prefix, &cancel).await,
                    Err(_) => Err(DriveError::Cancelled),
                };
                (prefix, result)
            });
        }

        while let Some(joined) = jobs.join_next().await {
            match joined {
                Ok((prefix, Ok(total))) => {
                    counts.insert(prefix.clone(), CountResult::ok(prefix, total));
                }
                Ok((prefix, Err(e))) => {
                    if !matches!(e, DriveError::Cancelled) {
                        warn!("Count for folder {:?} failed: {}", prefix, e);
                    }
                    counts.insert(prefix.clone(), CountResult::failed(prefix, e.kind()));
                }
                Err(join_error) => {
                    error!("Count job panicked: {}", join_error);
                }
            }
        }

        // A panicked job has no result of its own.
        for key in folders {
            if counts.get(&key).is_none() {
                counts.insert(key.clone(), CountResult::failed(key, ErrorKind::Internal));
            }
        }

        counts
    }
}
