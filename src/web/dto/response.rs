//! Response DTOs for the drive API.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::drive::{Breadcrumb, CountResult, EntryKind, FolderCounts, StoreEntry};
use crate::error::ErrorKind;

/// Kind of a listing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EntryKindResponse {
    Folder,
    File,
}

impl From<EntryKind> for EntryKindResponse {
    fn from(kind: EntryKind) -> Self {
        match kind {
            EntryKind::Folder => EntryKindResponse::Folder,
            EntryKind::File => EntryKindResponse::File,
        }
    }
}

/// A folder or file in a listing.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntryResponse {
    /// Full store key.
    pub key: String,
    /// Folder or file.
    pub kind: EntryKindResponse,
    /// Last path segment.
    pub display_name: String,
    /// Size in bytes (files only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Last modified time (files only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    /// MIME type.
    pub mime_type: String,
    /// Public download URL (files only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl EntryResponse {
    /// Build from a listing entry and its download URL.
    pub fn from_entry(entry: StoreEntry, url: Option<String>) -> Self {
        Self {
            key: entry.key,
            kind: entry.kind.into(),
            display_name: entry.display_name,
            size: entry.size,
            last_modified: entry.last_modified,
            mime_type: entry.mime_type,
            url,
        }
    }
}

/// One step of the navigation trail.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BreadcrumbResponse {
    /// Folder name.
    pub name: String,
    /// Prefix to list.
    pub prefix: String,
}

impl From<Breadcrumb> for BreadcrumbResponse {
    fn from(crumb: Breadcrumb) -> Self {
        Self {
            name: crumb.name,
            prefix: crumb.prefix,
        }
    }
}

/// Folder listing response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListResponse {
    /// Folders first, then files.
    pub entries: Vec<EntryResponse>,
    /// Resolved prefix that was listed.
    pub prefix: String,
    /// Number of entries.
    pub total: usize,
    /// Navigation trail, root first.
    pub breadcrumbs: Vec<BreadcrumbResponse>,
}

/// File count response.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    /// Resolved prefix that was counted.
    pub prefix: String,
    /// Number of files.
    pub total_files: u64,
    /// Whether nested folders were included.
    pub recursive: bool,
}

/// Recursive count of one child folder.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FolderCountResponse {
    /// Folder prefix.
    pub prefix: String,
    /// Number of files; 0 when `error` is set.
    pub total_files: u64,
    /// Why the count failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
}

impl From<CountResult> for FolderCountResponse {
    fn from(result: CountResult) -> Self {
        Self {
            prefix: result.prefix,
            total_files: result.total_files,
            error: result.error,
        }
    }
}

/// Folder listing with per-folder recursive counts.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BrowseResponse {
    /// Folders first, then files.
    pub entries: Vec<EntryResponse>,
    /// Resolved prefix that was listed.
    pub prefix: String,
    /// Number of entries.
    pub total: usize,
    /// Navigation trail, root first.
    pub breadcrumbs: Vec<BreadcrumbResponse>,
    /// Count per child folder key.
    pub counts: BTreeMap<String, FolderCountResponse>,
    /// Whether at least one folder count failed.
    pub partial_failure: bool,
}

impl BrowseResponse {
    /// Attach folder counts to a listing.
    pub fn new(listing: ListResponse, counts: FolderCounts) -> Self {
        let partial_failure = counts.is_partial_failure();
        Self {
            entries: listing.entries,
            prefix: listing.prefix,
            total: listing.total,
            breadcrumbs: listing.breadcrumbs,
            counts: counts
                .into_iter()
                .map(|(key, result)| (key, result.into()))
                .collect(),
            partial_failure,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always "OK".
    pub status: String,
    /// Current server time (RFC 3339).
    pub timestamp: String,
    /// Deployment environment name.
    pub environment: String,
}
