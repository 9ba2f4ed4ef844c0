//! In-memory object store.
//!
//! Behaves like a `ListObjectsV2` endpoint over a fixed key set:
//! - lexicographic key order
//! - delimiter roll-up into common prefixes
//! - bounded page size with opaque continuation tokens
//!
//! Latency and failures can be injected, and call / concurrency counters are
//! exposed so callers can assert on how the store was driven.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use super::{ListRequest, ListingPage, ObjectRecord, ObjectStore, StoreError};

/// Default number of entries per page, matching S3's `max-keys`.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

const KEY_TOKEN: &str = "k:";
const PREFIX_TOKEN: &str = "p:";

/// Position a continuation token resumes after.
enum Resume {
    /// Resume after this object key.
    Key(String),
    /// Resume after every key under this common prefix.
    Prefix(String),
}

impl Resume {
    fn decode(token: &str) -> Option<Self> {
        if let Some(key) = token.strip_prefix(KEY_TOKEN) {
            Some(Resume::Key(key.to_string()))
        } else {
            token
                .strip_prefix(PREFIX_TOKEN)
                .map(|p| Resume::Prefix(p.to_string()))
        }
    }

    fn encode(&self) -> String {
        match self {
            Resume::Key(key) => format!("{KEY_TOKEN}{key}"),
            Resume::Prefix(prefix) => format!("{PREFIX_TOKEN}{prefix}"),
        }
    }
}

/// In-memory store over a fixed set of objects.
#[derive(Debug)]
pub struct MemoryStore {
    objects: BTreeMap<String, ObjectRecord>,
    page_size: usize,
    latency: Duration,
    failing_prefixes: Vec<String>,
    transient_failures: AtomicUsize,
    fail_after_calls: Option<usize>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
            page_size: DEFAULT_PAGE_SIZE,
            latency: Duration::ZERO,
            failing_prefixes: Vec::new(),
            transient_failures: AtomicUsize::new(0),
            fail_after_calls: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Create a store from `(key, size)` pairs.
    pub fn from_keys<'a>(keys: impl IntoIterator<Item = (&'a str, u64)>) -> Self {
        keys.into_iter()
            .fold(Self::new(), |store, (key, size)| {
                store.with_object(ObjectRecord::new(key, size))
            })
    }

    /// Add an object. An existing object with the same key is replaced.
    pub fn with_object(mut self, object: ObjectRecord) -> Self {
        self.objects.insert(object.key.clone(), object);
        self
    }

    /// Set the maximum number of entries (objects + common prefixes) per page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Delay every call by this duration.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail every call whose request prefix starts with `prefix`.
    pub fn with_failing_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.failing_prefixes.push(prefix.into());
        self
    }

    /// Fail the next `count` calls with a transient error.
    pub fn with_transient_failures(self, count: usize) -> Self {
        self.transient_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Succeed for the first `calls` calls, then fail every call.
    pub fn with_failure_after(mut self, calls: usize) -> Self {
        self.fail_after_calls = Some(calls);
        self
    }

    /// Number of objects held.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Number of `list_page` calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of concurrently running `list_page` calls observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn injected_failure(&self, call_index: usize, prefix: &str) -> Option<StoreError> {
        let consumed = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if consumed {
            return Some(StoreError::Transient(
                "503 Service Unavailable (injected)".to_string(),
            ));
        }

        if self.failing_prefixes.iter().any(|p| prefix.starts_with(p)) {
            return Some(StoreError::Transient(format!(
                "injected failure listing {prefix}"
            )));
        }

        match self.fail_after_calls {
            Some(limit) if call_index >= limit => Some(StoreError::Transient(format!(
                "injected failure after {limit} calls"
            ))),
            _ => None,
        }
    }

    fn build_page(&self, request: &ListRequest) -> Result<ListingPage, StoreError> {
        let prefix = request.prefix.as_str();

        let resume = match request.continuation_token.as_deref() {
            None => None,
            Some(token) => Some(Resume::decode(token).ok_or_else(|| {
                StoreError::Rejected("InvalidRequest: malformed continuation token".to_string())
            })?),
        };

        let (start, mut skip_under) = match &resume {
            None => (Bound::Included(prefix.to_string()), None),
            Some(Resume::Key(key)) => (Bound::Excluded(key.clone()), None),
            Some(Resume::Prefix(p)) => (Bound::Excluded(p.clone()), Some(p.clone())),
        };

        let mut page = ListingPage::default();
        let mut taken = 0usize;
        let mut last: Option<Resume> = None;

        for (key, object) in self.objects.range((start, Bound::Unbounded)) {
            if !key.starts_with(prefix) {
                break;
            }
            if let Some(skip) = &skip_under {
                if key.starts_with(skip.as_str()) {
                    continue;
                }
            }

            let rolled_up = request.delimiter.and_then(|d| {
                key[prefix.len()..]
                    .find(d)
                    .map(|i| key[..prefix.len() + i + d.len_utf8()].to_string())
            });

            if taken == self.page_size {
                page.next_token = last.as_ref().map(Resume::encode);
                break;
            }

            match rolled_up {
                Some(common_prefix) => {
                    skip_under = Some(common_prefix.clone());
                    page.common_prefixes.push(common_prefix.clone());
                    last = Some(Resume::Prefix(common_prefix));
                }
                None => {
                    page.objects.push(object.clone());
                    last = Some(Resume::Key(key.clone()));
                }
            }
            taken += 1;
        }

        Ok(page)
    }
}

/// Decrements the in-flight counter when a call finishes.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_page(&self, request: &ListRequest) -> Result<ListingPage, StoreError> {
        let call_index = self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        // Always yield so concurrent callers interleave on a single-threaded runtime
        tokio::task::yield_now().await;
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }

        if let Some(err) = self.injected_failure(call_index, &request.prefix) {
            return Err(err);
        }

        self.build_page(request)
    }
}
