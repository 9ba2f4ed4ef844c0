//! Timeout and retry decorator for object stores.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::retry::{with_retry_cancellable, RetryConfig};
use super::{ListRequest, ListingPage, ObjectStore, SharedStore, StoreError};

/// Wraps a store so that every page request is bounded by a timeout and
/// transient failures are retried with backoff.
///
/// A timed-out attempt counts as a transient failure. Continuation of a
/// paginated listing is never treated as a retry; only the failing page
/// request is repeated.
pub struct ResilientStore {
    inner: SharedStore,
    timeout: Duration,
    retry: RetryConfig,
}

impl ResilientStore {
    /// Wrap a store.
    pub fn new(inner: SharedStore, timeout: Duration, retry: RetryConfig) -> Self {
        Self {
            inner,
            timeout,
            retry,
        }
    }

    /// Per-call timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Retry configuration.
    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }
}

#[async_trait]
impl ObjectStore for ResilientStore {
    async fn list_page(&self, request: &ListRequest) -> Result<ListingPage, StoreError> {
        self.list_page_with_cancel(request, &CancellationToken::new())
            .await
    }

    async fn list_page_with_cancel(
        &self,
        request: &ListRequest,
        cancel: &CancellationToken,
    ) -> Result<ListingPage, StoreError> {
        let inner = &self.inner;
        let timeout = self.timeout;

        with_retry_cancellable(&self.retry, "list_page", cancel, || async move {
            let call = inner.list_page_with_cancel(request, cancel);
            match tokio::time::timeout(timeout, call).await {
                Ok(result) => result,
                Err(_) => {
                    debug!(prefix = %request.prefix, timeout = ?timeout, "Store call timed out");
                    Err(StoreError::Timeout(timeout))
                }
            }
        })
        .await
    }
}
