//! Web server for the drive API.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use crate::config::WebConfig;
use crate::drive::DriveService;
use crate::{DriveError, Result};

use super::handlers::AppState;
use super::middleware::RateLimitState;
use super::router::{create_router_with_rate_limit, create_swagger_router};

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// Rate limit state.
    rate_limit_state: Arc<RateLimitState>,
    /// Web configuration.
    web_config: WebConfig,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &WebConfig, drive: Arc<DriveService>) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| DriveError::Config(format!("invalid web server address: {e}")))?;

        Ok(Self {
            addr,
            app_state: Arc::new(AppState::new(drive, config.environment.clone())),
            rate_limit_state: Arc::new(
                RateLimitState::new(config.api_rate_limit)
                    .with_trust_proxy_headers(config.trust_proxy_headers),
            ),
            web_config: config.clone(),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn build_router(&self) -> Router {
        create_router_with_rate_limit(
            self.app_state.clone(),
            &self.web_config,
            self.rate_limit_state.clone(),
        )
        .merge(create_swagger_router())
        .layer(CompressionLayer::new())
    }

    async fn bind(&self) -> std::io::Result<(TcpListener, SocketAddr)> {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        self.rate_limit_state.clone().start_cleanup_task();
        tracing::info!("Web server listening on http://{}", local_addr);

        Ok((listener, local_addr))
    }

    /// Run the web server.
    pub async fn run(self) -> std::io::Result<()> {
        let router = self.build_router();
        let (listener, _) = self.bind().await?;

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    }

    /// Run the server and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::io::Result<SocketAddr> {
        let router = self.build_router();
        let (listener, local_addr) = self.bind().await?;

        tokio::spawn(async move {
            if let Err(e) = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::PrefixScope;
    use crate::store::MemoryStore;

    fn create_test_config() -> WebConfig {
        WebConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Use random port
            cors_origins: vec![],
            api_rate_limit: 100,
            environment: "test".to_string(),
            trust_proxy_headers: false,
        }
    }

    fn create_drive() -> Arc<DriveService> {
        let store = MemoryStore::from_keys([("apuntes/Medicina/anatomy.pdf", 1024)]);
        Arc::new(DriveService::new(
            Arc::new(store),
            PrefixScope::new("apuntes/").unwrap(),
        ))
    }

    #[test]
    fn test_web_server_new() {
        let server = WebServer::new(&create_test_config(), create_drive()).unwrap();
        assert_eq!(server.addr().ip().to_string(), "127.0.0.1");
    }

    #[test]
    fn test_web_server_invalid_addr() {
        let mut config = create_test_config();
        config.host = "not an address".to_string();
        assert!(WebServer::new(&config, create_drive()).is_err());
    }

    #[tokio::test]
    async fn test_web_server_run() {
        let server = WebServer::new(&create_test_config(), create_drive()).unwrap();
        let addr = server.run_with_addr().await.unwrap();

        let client = reqwest::Client::new();
        let resp = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());

        let body: serde_json::Value = serde_json::from_str(&resp.text().await.unwrap()).unwrap();
        assert_eq!(body["status"], "OK");
        assert_eq!(body["environment"], "test");

        let resp = client
            .get(format!("http://{}/api/list?prefix=Medicina", addr))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());

        let body: serde_json::Value = serde_json::from_str(&resp.text().await.unwrap()).unwrap();
        assert_eq!(body["prefix"], "apuntes/Medicina/");
        assert_eq!(body["total"], 1);
    }
}
