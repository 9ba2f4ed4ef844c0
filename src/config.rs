//! Configuration module for apuntes.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::drive::PrefixScope;
use crate::store::RetryConfig;
use crate::{DriveError, Result};

/// Web server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Host address to bind.
    #[serde(default = "default_web_host")]
    pub host: String,
    /// Port number for the HTTP API.
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Rate limit for API endpoints (requests per minute per client IP).
    #[serde(default = "default_api_rate_limit")]
    pub api_rate_limit: u32,
    /// Deployment environment name reported by the health endpoint.
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Key rate limits on `X-Forwarded-For` / `X-Real-IP`.
    ///
    /// Only enable behind a reverse proxy that overwrites these headers.
    #[serde(default)]
    pub trust_proxy_headers: bool,
}

fn default_web_host() -> String {
    "0.0.0.0".to_string()
}

fn default_web_port() -> u16 {
    3001
}

fn default_api_rate_limit() -> u32 {
    120
}

fn default_environment() -> String {
    "development".to_string()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            cors_origins: vec![],
            api_rate_limit: default_api_rate_limit(),
            environment: default_environment(),
            trust_proxy_headers: false,
        }
    }
}

/// Object store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Bucket holding the notes.
    #[serde(default)]
    pub bucket: String,
    /// Cloudflare account id, used to derive the R2 endpoint.
    #[serde(default)]
    pub account_id: Option<String>,
    /// Explicit S3 endpoint (overrides the R2 endpoint).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Signing region ("auto" for R2).
    #[serde(default = "default_region")]
    pub region: String,
    /// Access key id.
    #[serde(default)]
    pub access_key_id: Option<String>,
    /// Secret access key.
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Public base URL for file downloads.
    #[serde(default)]
    pub public_url: Option<String>,
    /// Namespace root every caller prefix is confined to ("" for the whole bucket).
    #[serde(default = "default_root_prefix")]
    pub root_prefix: String,
    /// Use path-style addressing (MinIO, LocalStack).
    #[serde(default)]
    pub force_path_style: bool,
}

fn default_region() -> String {
    "auto".to_string()
}

fn default_root_prefix() -> String {
    "apuntes/".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            account_id: None,
            endpoint: None,
            region: default_region(),
            access_key_id: None,
            secret_access_key: None,
            public_url: None,
            root_prefix: default_root_prefix(),
            force_path_style: false,
        }
    }
}

impl StoreConfig {
    /// The endpoint to talk to: the explicit endpoint, or the R2 endpoint of the account.
    pub fn resolved_endpoint(&self) -> Result<String> {
        match (&self.endpoint, &self.account_id) {
            (Some(endpoint), _) if !endpoint.is_empty() => Ok(endpoint.clone()),
            (_, Some(account_id)) if !account_id.is_empty() => {
                Ok(format!("https://{account_id}.r2.cloudflarestorage.com"))
            }
            _ => Err(DriveError::Config(
                "store.endpoint or store.account_id must be set".to_string(),
            )),
        }
    }
}

/// Folder browsing and counting configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowseConfig {
    /// Number of folder counts computed concurrently per browse request.
    #[serde(default = "default_count_concurrency")]
    pub count_concurrency: usize,
    /// Deepest folder nesting a recursive count will walk.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Timeout for a single store call in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Retries for a failed store call.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Initial retry backoff in milliseconds.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
    /// Maximum retry backoff in milliseconds.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

fn default_count_concurrency() -> usize {
    5
}

fn default_max_depth() -> usize {
    32
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff() -> u64 {
    100
}

fn default_max_backoff() -> u64 {
    10_000
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            count_concurrency: default_count_concurrency(),
            max_depth: default_max_depth(),
            request_timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

impl BrowseConfig {
    /// Per-call store timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Retry policy for store calls.
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new()
            .with_max_retries(self.max_retries)
            .with_initial_backoff_ms(self.initial_backoff_ms)
            .with_max_backoff_ms(self.max_backoff_ms)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/apuntes.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Web server configuration.
    #[serde(default)]
    pub web: WebConfig,
    /// Object store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Browsing and counting configuration.
    #[serde(default)]
    pub browse: BrowseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(DriveError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| DriveError::Validation(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `R2_ACCESS_KEY_ID`, `R2_SECRET_ACCESS_KEY`: store credentials
    /// - `R2_ENDPOINT`, `R2_ACCOUNT_ID`: store endpoint
    /// - `R2_BUCKET_NAME`: bucket
    /// - `R2_PUBLIC_URL`: public download base URL
    /// - `PORT`: web port
    /// - `FRONTEND_URL`: extra CORS origin
    /// - `APUNTES_ENV`: environment name
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(v) = get("R2_ACCESS_KEY_ID") {
            self.store.access_key_id = Some(v);
        }
        if let Some(v) = get("R2_SECRET_ACCESS_KEY") {
            self.store.secret_access_key = Some(v);
        }
        if let Some(v) = get("R2_ENDPOINT") {
            self.store.endpoint = Some(v);
        }
        if let Some(v) = get("R2_ACCOUNT_ID") {
            self.store.account_id = Some(v);
        }
        if let Some(v) = get("R2_BUCKET_NAME") {
            self.store.bucket = v;
        }
        if let Some(v) = get("R2_PUBLIC_URL") {
            self.store.public_url = Some(v);
        }
        if let Some(port) = get("PORT").and_then(|v| v.parse().ok()) {
            self.web.port = port;
        }
        if let Some(origin) = get("FRONTEND_URL") {
            if !self.web.cors_origins.contains(&origin) {
                self.web.cors_origins.push(origin);
            }
        }
        if let Some(v) = get("APUNTES_ENV") {
            self.web.environment = v;
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - the bucket is not set
    /// - only one half of the credential pair is set
    /// - neither an endpoint nor an account id is set
    /// - an endpoint or public URL is not a valid URL
    /// - concurrency, depth or timeout is zero
    /// - the root prefix is not a valid folder prefix
    pub fn validate(&self) -> Result<()> {
        if self.store.bucket.is_empty() {
            return Err(DriveError::Validation(
                "store.bucket is not set. Set it in config.toml or via R2_BUCKET_NAME.".to_string(),
            ));
        }

        if self.store.access_key_id.is_some() != self.store.secret_access_key.is_some() {
            return Err(DriveError::Validation(
                "store.access_key_id and store.secret_access_key must be set together".to_string(),
            ));
        }

        let endpoint = self
            .store
            .resolved_endpoint()
            .map_err(|e| DriveError::Validation(e.to_string()))?;
        url::Url::parse(&endpoint)
            .map_err(|e| DriveError::Validation(format!("invalid store endpoint: {e}")))?;

        if let Some(public_url) = &self.store.public_url {
            url::Url::parse(public_url)
                .map_err(|e| DriveError::Validation(format!("invalid public_url: {e}")))?;
        }

        if self.browse.count_concurrency == 0 {
            return Err(DriveError::Validation(
                "browse.count_concurrency must be at least 1".to_string(),
            ));
        }
        if self.browse.max_depth == 0 {
            return Err(DriveError::Validation(
                "browse.max_depth must be at least 1".to_string(),
            ));
        }
        if self.browse.request_timeout_secs == 0 {
            return Err(DriveError::Validation(
                "browse.request_timeout_secs must be at least 1".to_string(),
            ));
        }

        PrefixScope::new(&self.store.root_prefix)
            .map_err(|e| DriveError::Validation(format!("store.root_prefix: {e}")))?;

        Ok(())
    }
}
