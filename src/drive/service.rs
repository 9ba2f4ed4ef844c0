//! Drive service: the operations the web layer exposes.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::aggregate::{Aggregator, FolderCounts, DEFAULT_POOL_SIZE};
use super::counter::RecursiveCounter;
use super::entry::StoreEntry;
use super::listing::ListingEngine;
use super::prefix::PrefixScope;
use super::public_url::PublicUrlBuilder;
use crate::config::Config;
use crate::store::{SharedStore, DELIMITER};
use crate::Result;

/// Sorted contents of one folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// Resolved prefix that was listed.
    pub prefix: String,
    /// Folders first, then files.
    pub entries: Vec<StoreEntry>,
}

/// A listing together with the recursive file count of each child folder.
#[derive(Debug, Clone)]
pub struct Browse {
    pub listing: Listing,
    pub counts: FolderCounts,
}

/// File total for a prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileCount {
    pub total_files: u64,
    pub recursive: bool,
}

/// One step of the navigation trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    /// Folder name shown to the user.
    pub name: String,
    /// Prefix to list when the step is selected.
    pub prefix: String,
}

/// Folder browsing over an object store, confined to a namespace root.
#[derive(Clone)]
pub struct DriveService {
    scope: PrefixScope,
    listing: ListingEngine,
    counter: Arc<RecursiveCounter>,
    aggregator: Aggregator,
    urls: PublicUrlBuilder,
}

impl DriveService {
    /// Create a service with default depth ceiling and pool size, without public URLs.
    pub fn new(store: SharedStore, scope: PrefixScope) -> Self {
        let counter = Arc::new(RecursiveCounter::new(store.clone()));
        Self {
            scope,
            listing: ListingEngine::new(store),
            aggregator: Aggregator::new(counter.clone(), DEFAULT_POOL_SIZE),
            counter,
            urls: PublicUrlBuilder::disabled(),
        }
    }

    /// Create a service from configuration.
    pub fn from_config(store: SharedStore, config: &Config) -> Result<Self> {
        let scope = PrefixScope::new(&config.store.root_prefix)?;
        let service = Self::new(store, scope)
            .with_max_depth(config.browse.max_depth)
            .with_pool_size(config.browse.count_concurrency)
            .with_public_urls(PublicUrlBuilder::from_config(&config.store));

        info!(
            "Drive ready: root {:?}, pool size {}, max depth {}",
            service.scope.root(),
            service.aggregator.pool_size(),
            service.counter.max_depth()
        );
        Ok(service)
    }

    /// Set the recursive count depth ceiling.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        let counter = Arc::new((*self.counter).clone().with_max_depth(max_depth));
        self.aggregator = Aggregator::new(counter.clone(), self.aggregator.pool_size());
        self.counter = counter;
        self
    }

    /// Set how many folders a browse counts at once.
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.aggregator = Aggregator::new(self.counter.clone(), pool_size);
        self
    }

    /// Set how public download URLs are built.
    pub fn with_public_urls(mut self, urls: PublicUrlBuilder) -> Self {
        self.urls = urls;
        self
    }

    /// The namespace scope.
    pub fn scope(&self) -> &PrefixScope {
        &self.scope
    }

    /// Resolve a caller path to a store prefix inside the root.
    pub fn resolve(&self, raw_prefix: &str) -> Result<String> {
        self.scope.resolve(raw_prefix)
    }

    /// List one folder.
    pub async fn list(&self, raw_prefix: &str) -> Result<Listing> {
        self.list_with_cancel(raw_prefix, &CancellationToken::new())
            .await
    }

    async fn list_with_cancel(&self, raw_prefix: &str, cancel: &CancellationToken) -> Result<Listing> {
        let prefix = self.resolve(raw_prefix)?;
        let entries = self.listing.list_with_cancel(&prefix, cancel).await?;
        Ok(Listing { prefix, entries })
    }

    /// Count the files under a folder, recursively or only its direct files.
    pub async fn count(&self, raw_prefix: &str, recursive: bool) -> Result<(String, FileCount)> {
        let prefix = self.resolve(raw_prefix)?;
        let total_files = if recursive {
            self.counter.count_files(&prefix).await?
        } else {
            self.counter.count_direct_files(&prefix).await?
        };
        debug!("{:?} holds {} files (recursive: {})", prefix, total_files, recursive);
        Ok((
            prefix,
            FileCount {
                total_files,
                recursive,
            },
        ))
    }

    /// Number of files directly inside a folder.
    pub async fn count_direct(&self, raw_prefix: &str) -> Result<u64> {
        let (_, count) = self.count(raw_prefix, false).await?;
        Ok(count.total_files)
    }

    /// List a folder and count the files under each of its child folders.
    ///
    /// Fails only when the listing itself fails; per-folder failures are
    /// reported in [`Browse::counts`].
    pub async fn browse(&self, raw_prefix: &str, cancel: &CancellationToken) -> Result<Browse> {
        let listing = self.list_with_cancel(raw_prefix, cancel).await?;
        let counts = self
            .aggregator
            .count_all_folders_with_cancel(&listing.entries, cancel)
            .await;

        if counts.is_partial_failure() {
            info!(
                "Browse of {:?} finished with {} of {} folder counts failed",
                listing.prefix,
                counts.failed().count(),
                counts.len()
            );
        }
        Ok(Browse { listing, counts })
    }

    /// List a folder keeping only entries whose name contains `term`, ignoring case.
    pub async fn search(&self, raw_prefix: &str, term: &str) -> Result<Listing> {
        let mut listing = self.list(raw_prefix).await?;
        let needle = term.trim().to_lowercase();
        if !needle.is_empty() {
            listing
                .entries
                .retain(|e| e.display_name.to_lowercase().contains(&needle));
        }
        Ok(listing)
    }

    /// Public download URL of a file key.
    pub fn file_url(&self, key: &str) -> Option<String> {
        self.urls.url_for(key)
    }

    /// Navigation trail from the root down to `prefix`, root first.
    pub fn breadcrumbs(&self, prefix: &str) -> Vec<Breadcrumb> {
        let root = self.scope.root();
        let root_name = root
            .trim_end_matches(DELIMITER)
            .rsplit(DELIMITER)
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("/");

        let mut trail = vec![Breadcrumb {
            name: root_name.to_string(),
            prefix: root.to_string(),
        }];

        let mut current = root.to_string();
        for segment in self
            .scope
            .relative(prefix)
            .split(DELIMITER)
            .filter(|s| !s.is_empty())
        {
            current.push_str(segment);
            current.push(DELIMITER);
            trail.push(Breadcrumb {
                name: segment.to_string(),
                prefix: current.clone(),
            });
        }
        trail
    }
}
