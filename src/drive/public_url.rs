//! Public download URLs for file keys.

use crate::config::StoreConfig;
use crate::store::DELIMITER;

/// Builds the public URL a browser downloads a file from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicUrlBuilder {
    base: Option<String>,
}

impl PublicUrlBuilder {
    /// Use `base` as the URL every key is appended to.
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        let base = base.trim_end_matches('/').to_string();
        Self {
            base: (!base.is_empty()).then_some(base),
        }
    }

    /// A builder that never produces URLs.
    pub fn disabled() -> Self {
        Self { base: None }
    }

    /// Derive the base from store settings.
    ///
    /// Order of preference: the configured public URL, the bucket's R2
    /// storage host, then a path-style URL on the explicit endpoint.
    pub fn from_config(config: &StoreConfig) -> Self {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());

        if let Some(public_url) = non_empty(&config.public_url) {
            return Self::new(public_url);
        }
        if let Some(account_id) = non_empty(&config.account_id) {
            return Self::new(format!(
                "https://{}.{account_id}.r2.cloudflarestorage.com",
                config.bucket
            ));
        }
        if let Some(endpoint) = non_empty(&config.endpoint) {
            return Self::new(format!(
                "{}/{}",
                endpoint.trim_end_matches('/'),
                config.bucket
            ));
        }
        Self::disabled()
    }

    /// Base URL, if any.
    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    /// URL of a file key, with every path segment percent-encoded.
    pub fn url_for(&self, key: &str) -> Option<String> {
        let base = self.base.as_deref()?;
        let encoded: Vec<String> = key
            .split(DELIMITER)
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        Some(format!("{base}/{}", encoded.join("/")))
    }
}
