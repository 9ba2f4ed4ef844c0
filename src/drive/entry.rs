//! Listing entries.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use super::mime::mime_type_for;
use crate::store::{ObjectRecord, DELIMITER};

/// Pseudo MIME type carried by folder entries.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.cloudflare.folder";

/// Kind of a listing entry. Folders order before files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryKind {
    Folder,
    File,
}

/// A single folder or file in a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    /// Full store key. Folder keys end with `/`, file keys never do.
    pub key: String,
    /// Folder or file.
    pub kind: EntryKind,
    /// Last path segment.
    pub display_name: String,
    /// Size in bytes (files only).
    pub size: Option<u64>,
    /// Last modified timestamp (files only).
    pub last_modified: Option<DateTime<Utc>>,
    /// MIME type derived from the extension.
    pub mime_type: String,
}

impl StoreEntry {
    /// Build a folder entry for a common prefix listed under `parent`.
    ///
    /// Returns `None` unless `key` is non-empty and ends with the delimiter.
    pub fn folder(parent: &str, key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        if key.is_empty() || !key.ends_with(DELIMITER) {
            return None;
        }

        let trimmed = key.strip_suffix(DELIMITER).unwrap_or(&key);
        let display_name = match trimmed.strip_prefix(parent) {
            Some(rest) if !rest.is_empty() => rest.to_string(),
            _ => last_segment(trimmed).to_string(),
        };

        Some(Self {
            key,
            kind: EntryKind::Folder,
            display_name,
            size: None,
            last_modified: None,
            mime_type: FOLDER_MIME_TYPE.to_string(),
        })
    }

    /// Build a file entry from a store object.
    ///
    /// Returns `None` for empty keys and folder markers.
    pub fn file(object: ObjectRecord) -> Option<Self> {
        if object.key.is_empty() || object.is_folder_marker() {
            return None;
        }

        let display_name = last_segment(&object.key).to_string();
        let mime_type = mime_type_for(&display_name).to_string();

        Some(Self {
            key: object.key,
            kind: EntryKind::File,
            display_name,
            size: Some(object.size),
            last_modified: object.last_modified,
            mime_type,
        })
    }

    /// Whether this entry is a folder.
    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit(DELIMITER).next().unwrap_or(path)
}

/// Listing order: folders first, then by [`collate`] on the display name.
pub fn compare_entries(a: &StoreEntry, b: &StoreEntry) -> Ordering {
    a.kind
        .cmp(&b.kind)
        .then_with(|| collate(&a.display_name, &b.display_name))
}

/// Map a character to its base letter for primary comparison.
fn base_letter(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        'ý' | 'ÿ' => 'y',
        _ => c,
    }
}

/// Locale-style string comparison.
///
/// Levels, in order:
/// 1. base letters, ignoring case and accents ("apunte" == "Apunté")
/// 2. accents ("a" < "á")
/// 3. case, lowercase first ("a" < "A")
/// 4. code points
pub fn collate(a: &str, b: &str) -> Ordering {
    let lower_a = a.to_lowercase();
    let lower_b = b.to_lowercase();

    lower_a
        .chars()
        .map(base_letter)
        .cmp(lower_b.chars().map(base_letter))
        .then_with(|| lower_a.cmp(&lower_b))
        .then_with(|| {
            a.chars()
                .map(char::is_uppercase)
                .cmp(b.chars().map(char::is_uppercase))
        })
        .then_with(|| a.cmp(b))
}
