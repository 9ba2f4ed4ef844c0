//! Recursive file counter.

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::listing::ListingEngine;
use crate::store::{ListRequest, SharedStore, DELIMITER};
use crate::{DriveError, Result};

/// Default ceiling on how many folder levels below a prefix are walked.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Counts files under a prefix with a flat, paginated scan.
#[derive(Clone)]
pub struct RecursiveCounter {
    store: SharedStore,
    max_depth: usize,
}

impl RecursiveCounter {
    /// Create a counter with the default depth ceiling.
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set the depth ceiling.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// The configured depth ceiling.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Count every file at any depth under `prefix`.
    ///
    /// Folder markers (keys ending in `/`) are never counted. A failed page
    /// fails the whole count; no partial total is ever returned.
    pub async fn count_files(&self, prefix: &str) -> Result<u64> {
        self.count_files_with_cancel(prefix, &CancellationToken::new())
            .await
    }

    /// Like [`count_files`](Self::count_files), honouring `cancel` around every
    /// page and between the store's retry attempts.
    pub async fn count_files_with_cancel(
        &self,
        prefix: &str,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let mut total = 0u64;
        let mut token: Option<String> = None;
        let mut seen_tokens: HashSet<String> = HashSet::new();
        let mut pages = 0usize;

        loop {
            if cancel.is_cancelled() {
                return Err(DriveError::Cancelled);
            }

            let request = ListRequest::new(prefix).with_continuation_token(token.take());
            let page = self
                .store
                .list_page_with_cancel(&request, cancel)
                .await
                .map_err(|e| {
                    warn!("Counting {:?} failed on page {}: {}", prefix, pages + 1, e);
                    DriveError::from(e)
                })?;
            pages += 1;

            // The page finished after cancellation; drop it.
            if cancel.is_cancelled() {
                return Err(DriveError::Cancelled);
            }

            for object in &page.objects {
                let Some(rest) = object.key.strip_prefix(prefix) else {
                    continue;
                };
                if rest.matches(DELIMITER).count() > self.max_depth {
                    warn!(
                        "Depth ceiling {} exceeded under {:?} at {:?}",
                        self.max_depth, prefix, object.key
                    );
                    return Err(DriveError::DepthExceeded {
                        prefix: prefix.to_string(),
                        limit: self.max_depth,
                    });
                }
                if !object.is_folder_marker() {
                    total += 1;
                }
            }

            match page.next_token {
                Some(next) => {
                    if !seen_tokens.insert(next.clone()) {
                        return Err(DriveError::StoreUnavailable(format!(
                            "store repeated continuation token while counting {prefix:?}"
                        )));
                    }
                    token = Some(next);
                }
                None => break,
            }
        }

        debug!("Counted {} files under {:?} in {} pages", total, prefix, pages);
        Ok(total)
    }

    /// Count only the files directly inside `prefix`.
    pub async fn count_direct_files(&self, prefix: &str) -> Result<u64> {
        let entries = ListingEngine::new(self.store.clone()).list(prefix).await?;
        Ok(entries.iter().filter(|e| !e.is_folder()).count() as u64)
    }
}
