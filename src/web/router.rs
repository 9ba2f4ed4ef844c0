//! Router configuration for the drive API.

use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::dto::{
    BreadcrumbResponse, BrowseResponse, CountResponse, EntryKindResponse, EntryResponse,
    FolderCountResponse, HealthResponse, ListResponse,
};
use super::error::{ApiError, ErrorBody, ErrorCode};
use super::handlers::{self, AppState};
use super::middleware::{api_rate_limit, create_cors_layer, security_headers, RateLimitState};
use crate::config::WebConfig;
use crate::error::ErrorKind;

/// OpenAPI document for the drive API.
#[derive(OpenApi)]
#[openapi(
    info(title = "apuntes", description = "Study notes drive API"),
    paths(
        handlers::list_entries,
        handlers::count_files,
        handlers::browse_folder,
        handlers::search_entries,
        handlers::health_check
    ),
    components(schemas(
        ListResponse,
        EntryResponse,
        EntryKindResponse,
        BreadcrumbResponse,
        CountResponse,
        BrowseResponse,
        FolderCountResponse,
        HealthResponse,
        ErrorBody,
        ErrorCode,
        ErrorKind
    )),
    tags(
        (name = "drive", description = "Folder listing and file counts"),
        (name = "health", description = "Health check")
    )
)]
pub struct ApiDoc;

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>, config: &WebConfig) -> Router {
    let rate_limit_state = Arc::new(
        RateLimitState::new(config.api_rate_limit)
            .with_trust_proxy_headers(config.trust_proxy_headers),
    );
    create_router_with_rate_limit(app_state, config, rate_limit_state)
}

/// Create the main API router with an existing rate limit state.
pub fn create_router_with_rate_limit(
    app_state: Arc<AppState>,
    config: &WebConfig,
    rate_limit_state: Arc<RateLimitState>,
) -> Router {
    let api_routes = Router::new()
        .route("/list", get(handlers::list_entries))
        .route("/count", get(handlers::count_files))
        .route("/browse", get(handlers::browse_folder))
        .route("/search", get(handlers::search_entries))
        .layer(middleware::from_fn(move |req, next| {
            let state = rate_limit_state.clone();
            api_rate_limit(state, req, next)
        }));

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(handlers::health_check))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(&config.cors_origins))
                .layer(middleware::from_fn(security_headers)),
        )
        .with_state(app_state)
}

/// Create the Swagger UI router serving the OpenAPI document.
pub fn create_swagger_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
