//! Folder browsing over the object store.
//!
//! This module provides:
//! - Prefix normalization and namespace scoping
//! - Single-level listings split into folders and files
//! - Recursive file counts with a depth ceiling
//! - Bounded-concurrency aggregation of per-folder counts
//! - The [`DriveService`] that ties them together for the web layer

mod aggregate;
mod counter;
mod entry;
mod listing;
mod mime;
mod prefix;
mod public_url;
mod service;

pub use aggregate::{Aggregator, CountResult, FolderCounts, DEFAULT_POOL_SIZE};
pub use counter::{RecursiveCounter, DEFAULT_MAX_DEPTH};
pub use entry::{collate, compare_entries, EntryKind, StoreEntry, FOLDER_MIME_TYPE};
pub use listing::ListingEngine;
pub use mime::{extension, mime_type_for, DEFAULT_MIME_TYPE};
pub use prefix::{normalize, PrefixScope, MAX_PREFIX_BYTES};
pub use public_url::PublicUrlBuilder;
pub use service::{Breadcrumb, Browse, DriveService, FileCount, Listing};
