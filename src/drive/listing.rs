//! Listing engine: one folder level, fully paginated.

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::entry::{compare_entries, StoreEntry};
use crate::store::{ListRequest, ObjectRecord, SharedStore, DELIMITER};
use crate::{DriveError, Result};

/// Produces the sorted folder/file view of a single prefix.
#[derive(Clone)]
pub struct ListingEngine {
    store: SharedStore,
}

impl ListingEngine {
    /// Create an engine over a store.
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// List the direct children of `prefix`.
    ///
    /// `prefix` must already be normalized. Folders come first, then files,
    /// each group sorted by display name.
    pub async fn list(&self, prefix: &str) -> Result<Vec<StoreEntry>> {
        self.list_with_cancel(prefix, &CancellationToken::new())
            .await
    }

    /// Like [`list`](Self::list), honouring `cancel` around every page.
    pub async fn list_with_cancel(
        &self,
        prefix: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<StoreEntry>> {
        let mut folders: Vec<StoreEntry> = Vec::new();
        let mut files: Vec<StoreEntry> = Vec::new();
        let mut seen_folders: HashSet<String> = HashSet::new();
        let mut token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            if cancel.is_cancelled() {
                return Err(DriveError::Cancelled);
            }

            let request = ListRequest::new(prefix)
                .with_delimiter(DELIMITER)
                .with_continuation_token(token.take());

            let page = self
                .store
                .list_page_with_cancel(&request, cancel)
                .await
                .map_err(|e| {
                    warn!("Listing {:?} failed on page {}: {}", prefix, pages + 1, e);
                    DriveError::from(e)
                })?;
            pages += 1;

            if cancel.is_cancelled() {
                return Err(DriveError::Cancelled);
            }

            for common_prefix in page.common_prefixes {
                if common_prefix == prefix || seen_folders.contains(&common_prefix) {
                    continue;
                }
                if let Some(folder) = StoreEntry::folder(prefix, common_prefix.clone()) {
                    seen_folders.insert(common_prefix);
                    folders.push(folder);
                }
            }

            files.extend(
                page.objects
                    .into_iter()
                    .filter(|object| is_direct_file(prefix, object))
                    .filter_map(StoreEntry::file),
            );

            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        debug!(
            "Listed {:?}: {} folders, {} files in {} pages",
            prefix,
            folders.len(),
            files.len(),
            pages
        );

        let mut entries = folders;
        entries.append(&mut files);
        entries.sort_by(compare_entries);
        Ok(entries)
    }
}

/// A direct file of `prefix`: not a marker, inside the prefix, no deeper `/`.
fn is_direct_file(prefix: &str, object: &ObjectRecord) -> bool {
    if object.is_folder_marker() {
        return false;
    }
    match object.key.strip_prefix(prefix) {
        Some(rest) => !rest.is_empty() && !rest.contains(DELIMITER),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::entry::EntryKind;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn engine(store: MemoryStore) -> ListingEngine {
        ListingEngine::new(Arc::new(store))
    }

    fn medicina_store() -> MemoryStore {
        MemoryStore::from_keys([
            ("apuntes/Medicina/", 0),
            ("apuntes/Medicina/Year1/", 0),
            ("apuntes/Medicina/Year1/a.pdf", 10),
            ("apuntes/Medicina/anatomy.pdf", 1024),
        ])
    }

    #[tokio::test]
    async fn test_list_partitions_folders_and_files() {
        let entries = engine(medicina_store())
            .list("apuntes/Medicina/")
            .await
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, EntryKind::Folder);
        assert_eq!(entries[0].key, "apuntes/Medicina/Year1/");
        assert_eq!(entries[0].display_name, "Year1");
        assert_eq!(entries[1].kind, EntryKind::File);
        assert_eq!(entries[1].key, "apuntes/Medicina/anatomy.pdf");
        assert_eq!(entries[1].size, Some(1024));
        assert_eq!(entries[1].mime_type, "application/pdf");
    }

    #[tokio::test]
    async fn test_list_excludes_folder_marker_of_prefix() {
        let entries = engine(medicina_store())
            .list("apuntes/Medicina/")
            .await
            .unwrap();

        assert!(entries.iter().all(|e| e.key != "apuntes/Medicina/"));
    }

    #[tokio::test]
    async fn test_list_sorted_folders_then_files() {
        let store = MemoryStore::from_keys([
            ("r/zeta.pdf", 1),
            ("r/Beta/x.pdf", 1),
            ("r/alpha.txt", 1),
            ("r/álgebra/x.pdf", 1),
            ("r/Zoo/x.pdf", 1),
        ]);
        let names: Vec<String> = engine(store)
            .list("r/")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.display_name)
            .collect();

        assert_eq!(names, vec!["álgebra", "Beta", "Zoo", "alpha.txt", "zeta.pdf"]);
    }

    #[tokio::test]
    async fn test_list_across_pages_dedupes_folders() {
        let store = medicina_store()
            .with_object(ObjectRecord::new("apuntes/Medicina/Year2/b.pdf", 1))
            .with_object(ObjectRecord::new("apuntes/Medicina/zz.txt", 1))
            .with_page_size(1);

        let entries = engine(store).list("apuntes/Medicina/").await.unwrap();
        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();

        assert_eq!(
            keys,
            vec![
                "apuntes/Medicina/Year1/",
                "apuntes/Medicina/Year2/",
                "apuntes/Medicina/anatomy.pdf",
                "apuntes/Medicina/zz.txt",
            ]
        );
    }

    #[tokio::test]
    async fn test_list_partition_law() {
        let store = MemoryStore::from_keys([
            ("p/", 0),
            ("p/a.pdf", 1),
            ("p/b/", 0),
            ("p/b/c.pdf", 1),
            ("p/b/d/e.pdf", 1),
            ("p/f/g.txt", 1),
            ("q/h.pdf", 1),
        ]);
        let entries = engine(store).list("p/").await.unwrap();

        for entry in &entries {
            assert!(entry.key.starts_with("p/"));
            let rest = &entry.key["p/".len()..];
            match entry.kind {
                EntryKind::Folder => {
                    assert!(rest.ends_with('/'));
                    assert_eq!(rest.matches('/').count(), 1);
                }
                EntryKind::File => {
                    assert!(!rest.is_empty());
                    assert!(!rest.contains('/'));
                }
            }
        }
        let mut keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), entries.len());
        assert_eq!(entries.len(), 3);
    }

    #[tokio::test]
    async fn test_list_empty_prefix() {
        let entries = engine(MemoryStore::new()).list("").await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_list_store_failure() {
        let store = medicina_store().with_failing_prefix("apuntes/");
        let result = engine(store).list("apuntes/Medicina/").await;

        assert!(matches!(result, Err(DriveError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_list_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let store = Arc::new(medicina_store());
        let engine = ListingEngine::new(store.clone());
        let result = engine.list_with_cancel("apuntes/Medicina/", &cancel).await;

        assert!(matches!(result, Err(DriveError::Cancelled)));
        assert_eq!(store.calls(), 0);
    }
}
