//! S3-compatible store backend (Cloudflare R2, MinIO, AWS S3).

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use chrono::DateTime;
use tracing::{debug, info};

use super::{ListRequest, ListingPage, ObjectRecord, ObjectStore, StoreError};
use crate::config::StoreConfig;
use crate::Result;

/// Store backend issuing `ListObjectsV2` calls against one bucket.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Create a store from an existing client.
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client from configuration and wrap it.
    ///
    /// When no endpoint is configured the Cloudflare R2 endpoint for
    /// `account_id` is used. Explicit credentials take precedence over the
    /// default AWS credential chain.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let endpoint = config.resolved_endpoint()?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&endpoint);

        if let (Some(access_key), Some(secret_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            let credentials = aws_sdk_s3::config::Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "apuntes-config",
            );
            loader = loader.credentials_provider(credentials);
        } else {
            info!("No explicit store credentials configured, using the default credential chain");
        }

        let sdk_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style)
            .build();

        info!(bucket = %config.bucket, endpoint = %endpoint, "Object store client configured");

        Ok(Self::new(Client::from_conf(s3_config), &config.bucket))
    }

    /// Get the bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_page(&self, request: &ListRequest) -> std::result::Result<ListingPage, StoreError> {
        let mut req = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(&request.prefix);

        if let Some(delimiter) = request.delimiter {
            req = req.delimiter(delimiter.to_string());
        }

        if let Some(ref token) = request.continuation_token {
            req = req.continuation_token(token);
        }

        let resp = req.send().await.map_err(|e| {
            StoreError::from_message(format!(
                "S3 list objects failed: {}",
                DisplayErrorContext(&e)
            ))
        })?;

        let mut page = ListingPage::default();

        if let Some(contents) = resp.contents {
            for obj in contents {
                let key = obj.key.unwrap_or_default();

                // Skip empty keys
                if key.is_empty() {
                    continue;
                }

                let last_modified = obj
                    .last_modified
                    .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()));

                page.objects.push(ObjectRecord {
                    key,
                    size: obj.size.unwrap_or(0).max(0) as u64,
                    last_modified,
                });
            }
        }

        if let Some(common_prefixes) = resp.common_prefixes {
            page.common_prefixes = common_prefixes
                .into_iter()
                .filter_map(|cp| cp.prefix)
                .collect();
        }

        page.next_token = next_page_token(resp.is_truncated, resp.next_continuation_token)?;

        debug!(
            prefix = %request.prefix,
            objects = page.objects.len(),
            common_prefixes = page.common_prefixes.len(),
            truncated = page.next_token.is_some(),
            "Listed store page"
        );

        Ok(page)
    }
}

/// Token for the next page of a response.
///
/// A truncated response without a token cannot be continued, so it is an
/// error rather than the end of the listing.
fn next_page_token(
    is_truncated: Option<bool>,
    token: Option<String>,
) -> std::result::Result<Option<String>, StoreError> {
    match (is_truncated, token) {
        (Some(true), Some(token)) => Ok(Some(token)),
        (Some(true), None) => Err(StoreError::Transient(
            "truncated listing without continuation token".to_string(),
        )),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_with_explicit_endpoint() {
        let config = StoreConfig {
            bucket: "notes".to_string(),
            endpoint: Some("http://localhost:9000".to_string()),
            access_key_id: Some("access".to_string()),
            secret_access_key: Some("secret".to_string()),
            force_path_style: true,
            ..StoreConfig::default()
        };

        let store = S3Store::connect(&config).await.unwrap();
        assert_eq!(store.bucket(), "notes");
    }

    #[tokio::test]
    async fn test_connect_requires_endpoint_or_account() {
        let config = StoreConfig {
            bucket: "notes".to_string(),
            ..StoreConfig::default()
        };

        assert!(S3Store::connect(&config).await.is_err());
    }

    #[test]
    fn test_next_page_token() {
        assert_eq!(
            next_page_token(Some(true), Some("t1".to_string())).unwrap(),
            Some("t1".to_string())
        );
        assert_eq!(next_page_token(Some(false), None).unwrap(), None);
        assert_eq!(next_page_token(None, None).unwrap(), None);
        assert_eq!(
            next_page_token(Some(false), Some("stale".to_string())).unwrap(),
            None
        );
    }

    #[test]
    fn test_truncated_without_token_is_error() {
        let err = next_page_token(Some(true), None).unwrap_err();
        assert!(matches!(err, StoreError::Transient(_)));
        assert!(err.to_string().contains("without continuation token"));
    }
}
