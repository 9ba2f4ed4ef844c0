//! Object store capability.
//!
//! The drive never talks to a concrete backend directly. Everything goes through
//! the [`ObjectStore`] trait, which models a single paginated
//! `ListObjectsV2`-style call:
//! - optional delimiter partitioning into common prefixes
//! - opaque continuation tokens
//!
//! Backends:
//! - [`S3Store`] for Cloudflare R2 and other S3-compatible services
//! - [`MemoryStore`] for tests and local runs
//! - [`ResilientStore`] wraps any backend with per-call timeouts and retries

mod memory;
mod resilient;
mod retry;
mod s3;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

pub use memory::MemoryStore;
pub use resilient::ResilientStore;
pub use retry::{classify_error, with_retry, with_retry_cancellable, ErrorClassification, RetryConfig};
pub use s3::S3Store;

/// The only folder separator understood by the drive.
pub const DELIMITER: char = '/';

/// A raw object as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    /// Full object key.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modified timestamp, when the store reports one.
    pub last_modified: Option<DateTime<Utc>>,
}

impl ObjectRecord {
    /// Create a record without a timestamp.
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
            last_modified: None,
        }
    }

    /// Set the last modified timestamp.
    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = Some(last_modified);
        self
    }

    /// Whether this object is a folder marker (key ends with the delimiter).
    pub fn is_folder_marker(&self) -> bool {
        self.key.ends_with(DELIMITER)
    }
}

/// Parameters of one listing call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListRequest {
    /// Key prefix to list under.
    pub prefix: String,
    /// Partition keys into common prefixes at this character.
    pub delimiter: Option<char>,
    /// Token from the previous page.
    pub continuation_token: Option<String>,
}

impl ListRequest {
    /// Create a flat listing request for a prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            delimiter: None,
            continuation_token: None,
        }
    }

    /// Request delimiter partitioning.
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Continue from a previous page.
    pub fn with_continuation_token(mut self, token: Option<String>) -> Self {
        self.continuation_token = token;
        self
    }
}

/// One page returned by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Objects on this page.
    pub objects: Vec<ObjectRecord>,
    /// Common prefixes on this page (only with a delimiter).
    pub common_prefixes: Vec<String>,
    /// Token for the next page; `None` when the listing is complete.
    pub next_token: Option<String>,
}

/// Error type for store calls.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("store request timed out after {0:?}")]
    Timeout(Duration),

    /// Throttling, 5xx, connection failures.
    #[error("transient store error: {0}")]
    Transient(String),

    /// Access denied, missing bucket, malformed request.
    #[error("store rejected request: {0}")]
    Rejected(String),

    #[error("store call cancelled")]
    Cancelled,
}

impl StoreError {
    /// Build an error from a backend message, classifying it for retries.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        match classify_error(&message) {
            ErrorClassification::Retryable => StoreError::Transient(message),
            ErrorClassification::NonRetryable => StoreError::Rejected(message),
        }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, StoreError::Rejected(_) | StoreError::Cancelled)
    }
}

/// Paginated listing capability of an object store.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Fetch a single page of results.
    async fn list_page(&self, request: &ListRequest) -> Result<ListingPage, StoreError>;

    /// Fetch a single page unless `cancel` has fired.
    ///
    /// A request already sent to the backend runs to completion; backends
    /// that make several attempts per page must stop between attempts.
    async fn list_page_with_cancel(
        &self,
        request: &ListRequest,
        cancel: &CancellationToken,
    ) -> Result<ListingPage, StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        self.list_page(request).await
    }
}

/// Store handle shared read-only across concurrent jobs.
pub type SharedStore = Arc<dyn ObjectStore>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_request_builder() {
        let req = ListRequest::new("apuntes/")
            .with_delimiter(DELIMITER)
            .with_continuation_token(Some("tok".to_string()));

        assert_eq!(req.prefix, "apuntes/");
        assert_eq!(req.delimiter, Some('/'));
        assert_eq!(req.continuation_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_folder_marker() {
        assert!(ObjectRecord::new("a/", 0).is_folder_marker());
        assert!(!ObjectRecord::new("a/x.pdf", 10).is_folder_marker());
    }

    #[test]
    fn test_store_error_classification() {
        assert!(StoreError::from_message("SlowDown: reduce your request rate").is_retryable());
        assert!(!StoreError::from_message("AccessDenied").is_retryable());
        assert!(StoreError::Timeout(Duration::from_secs(1)).is_retryable());
    }
}
