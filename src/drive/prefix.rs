//! Prefix normalization and namespace scoping.
//!
//! Callers address folders with free-form paths. Before a path reaches the
//! store it is normalized to a folder prefix (trailing delimiter) and confined
//! to the configured namespace root, so no crafted prefix can list keys
//! outside of it.

use crate::store::DELIMITER;
use crate::{DriveError, Result};

/// Longest prefix accepted, matching the S3 key length limit.
pub const MAX_PREFIX_BYTES: usize = 1024;

/// Turn a caller-supplied folder path into a store prefix.
///
/// The empty string stays empty (bucket root). Any other string gets a
/// trailing `/` unless it already has one.
pub fn normalize(raw: &str) -> String {
    if raw.is_empty() || raw.ends_with(DELIMITER) {
        raw.to_string()
    } else {
        format!("{raw}{DELIMITER}")
    }
}

/// Check the segments of a normalized, root-marker-free prefix.
fn check_segments(prefix: &str) -> Result<()> {
    if prefix.len() > MAX_PREFIX_BYTES {
        return Err(DriveError::InvalidPrefix(format!(
            "prefix longer than {MAX_PREFIX_BYTES} bytes"
        )));
    }

    if prefix.chars().any(char::is_control) {
        return Err(DriveError::InvalidPrefix(
            "prefix contains control characters".to_string(),
        ));
    }

    let Some(body) = prefix.strip_suffix(DELIMITER) else {
        return Ok(());
    };

    for segment in body.split(DELIMITER) {
        match segment {
            "" => {
                return Err(DriveError::InvalidPrefix(format!(
                    "empty path segment in {prefix:?}"
                )))
            }
            "." | ".." => {
                return Err(DriveError::InvalidPrefix(format!(
                    "relative path segment {segment:?} in {prefix:?}"
                )))
            }
            _ => {}
        }
    }

    Ok(())
}

/// Namespace root that every resolved prefix lives under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixScope {
    root: String,
}

impl PrefixScope {
    /// Create a scope rooted at `root`. An empty root (or `/`) spans the whole bucket.
    pub fn new(root: &str) -> Result<Self> {
        let normalized = normalize(root);
        let root = normalized
            .strip_prefix(DELIMITER)
            .unwrap_or(&normalized)
            .to_string();
        check_segments(&root)?;
        Ok(Self { root })
    }

    /// Scope spanning the whole bucket.
    pub fn unscoped() -> Self {
        Self {
            root: String::new(),
        }
    }

    /// The namespace root ("" when unscoped).
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Resolve a caller-supplied path to a store prefix inside the root.
    ///
    /// `""` and `"/"` resolve to the root itself. A single leading `/` is
    /// treated as a root marker and dropped. Paths that already start with the
    /// root are kept; anything else is placed under the root.
    ///
    /// Fails with [`DriveError::InvalidPrefix`] on control characters, empty
    /// segments, `.`/`..` segments or oversized prefixes.
    pub fn resolve(&self, raw: &str) -> Result<String> {
        let normalized = normalize(raw);
        let relative = normalized.strip_prefix(DELIMITER).unwrap_or(&normalized);
        check_segments(relative)?;

        let resolved = if relative.starts_with(&self.root) {
            relative.to_string()
        } else {
            format!("{}{relative}", self.root)
        };

        if resolved.len() > MAX_PREFIX_BYTES {
            return Err(DriveError::InvalidPrefix(format!(
                "prefix longer than {MAX_PREFIX_BYTES} bytes"
            )));
        }

        Ok(resolved)
    }

    /// Whether a store prefix or key lies inside this scope.
    pub fn contains(&self, key: &str) -> bool {
        key.starts_with(&self.root)
    }

    /// Path of a resolved prefix relative to the root.
    pub fn relative<'a>(&self, prefix: &'a str) -> &'a str {
        prefix.strip_prefix(self.root.as_str()).unwrap_or(prefix)
    }
}
