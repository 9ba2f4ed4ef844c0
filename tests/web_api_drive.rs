//! Web API Drive Tests
//!
//! Integration tests for the listing, count, browse and search endpoints.

use apuntes::config::{Config, WebConfig};
use apuntes::drive::{DriveService, PrefixScope, PublicUrlBuilder};
use apuntes::store::{MemoryStore, ObjectRecord};
use apuntes::web::handlers::AppState;
use apuntes::web::router::create_router;
use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::{TimeZone, Utc};
use serde_json::Value;
use std::sync::Arc;

/// Create a test configuration.
fn create_test_config() -> WebConfig {
    WebConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec![],
        api_rate_limit: 1000,
        environment: "test".to_string(),
        trust_proxy_headers: false,
    }
}

/// Sample bucket with a handful of courses.
fn sample_store() -> MemoryStore {
    let modified = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    MemoryStore::from_keys([
        ("apuntes/", 0),
        ("apuntes/Medicina/", 0),
        ("apuntes/Medicina/Year1/", 0),
        ("apuntes/Medicina/Year1/a.pdf", 10),
        ("apuntes/Derecho/civil.pdf", 5),
        ("apuntes/Derecho/penal/p1.pdf", 5),
        ("apuntes/Derecho/penal/p2.docx", 5),
        ("apuntes/indice.txt", 3),
        ("privado/secreto.pdf", 1),
    ])
    .with_object(
        ObjectRecord::new("apuntes/Medicina/anatomy.pdf", 1024).with_last_modified(modified),
    )
}

/// Create a test server over an in-memory store rooted at `root`.
fn create_test_server_with(store: MemoryStore, root: &str) -> TestServer {
    let config = create_test_config();

    let drive = DriveService::new(Arc::new(store), PrefixScope::new(root).unwrap())
        .with_public_urls(PublicUrlBuilder::new("https://files.example.com"));
    let app_state = Arc::new(AppState::new(Arc::new(drive), config.environment.clone()));

    let router = create_router(app_state, &config);
    TestServer::new(router).expect("Failed to create test server")
}

fn create_test_server() -> TestServer {
    create_test_server_with(sample_store(), "apuntes/")
}

fn keys(body: &Value) -> Vec<String> {
    body["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["key"].as_str().unwrap().to_string())
        .collect()
}

// ============================================================================
// List
// ============================================================================

#[tokio::test]
async fn test_list_folder() {
    let server = create_test_server();

    let response = server
        .get("/api/list")
        .add_query_param("prefix", "apuntes/Medicina/")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["prefix"], "apuntes/Medicina/");
    assert_eq!(body["total"], 2);

    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries[0]["key"], "apuntes/Medicina/Year1/");
    assert_eq!(entries[0]["kind"], "folder");
    assert_eq!(entries[0]["displayName"], "Year1");
    assert_eq!(entries[0]["mimeType"], "application/vnd.cloudflare.folder");
    assert!(entries[0].get("size").is_none());

    assert_eq!(entries[1]["key"], "apuntes/Medicina/anatomy.pdf");
    assert_eq!(entries[1]["kind"], "file");
    assert_eq!(entries[1]["size"], 1024);
    assert_eq!(entries[1]["mimeType"], "application/pdf");
    assert_eq!(entries[1]["lastModified"], "2024-03-01T12:00:00Z");
    assert_eq!(
        entries[1]["url"],
        "https://files.example.com/apuntes/Medicina/anatomy.pdf"
    );
}

#[tokio::test]
async fn test_list_without_trailing_slash() {
    let server = create_test_server();

    let response = server
        .get("/api/list")
        .add_query_param("prefix", "Medicina")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["prefix"], "apuntes/Medicina/");
    assert_eq!(body["total"], 2);
}

#[tokio::test]
async fn test_list_root() {
    let server = create_test_server();

    let response = server.get("/api/list").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["prefix"], "apuntes/");
    assert_eq!(
        keys(&body),
        vec!["apuntes/Derecho/", "apuntes/Medicina/", "apuntes/indice.txt"]
    );
}

#[tokio::test]
async fn test_list_breadcrumbs() {
    let server = create_test_server();

    let response = server
        .get("/api/list")
        .add_query_param("prefix", "Medicina/Year1")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let crumbs = body["breadcrumbs"].as_array().unwrap();
    assert_eq!(crumbs.len(), 3);
    assert_eq!(crumbs[0]["name"], "apuntes");
    assert_eq!(crumbs[0]["prefix"], "apuntes/");
    assert_eq!(crumbs[2]["name"], "Year1");
    assert_eq!(crumbs[2]["prefix"], "apuntes/Medicina/Year1/");
}

#[tokio::test]
async fn test_list_empty_folder() {
    let server = create_test_server();

    let response = server
        .get("/api/list")
        .add_query_param("prefix", "Vacio")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["entries"], Value::Array(vec![]));
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_list_empty_bucket_unscoped() {
    let server = create_test_server_with(MemoryStore::new(), "");

    let response = server.get("/api/list").add_query_param("prefix", "").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["entries"], Value::Array(vec![]));
    assert_eq!(body["prefix"], "");
}

#[tokio::test]
async fn test_list_stays_inside_root() {
    let server = create_test_server();

    let response = server
        .get("/api/list")
        .add_query_param("prefix", "privado")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["prefix"], "apuntes/privado/");
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_list_rejects_traversal() {
    let server = create_test_server();

    let response = server
        .get("/api/list")
        .add_query_param("prefix", "../privado")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "INVALID_PREFIX");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_list_rejects_control_characters() {
    let server = create_test_server();

    let response = server
        .get("/api/list")
        .add_query_param("prefix", "bad\u{7}name")
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_list_store_unavailable() {
    let server = create_test_server_with(sample_store().with_failing_prefix("apuntes/"), "apuntes/");

    let response = server.get("/api/list").await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"], "STORE_UNAVAILABLE");
    assert!(body.get("entries").is_none());
}

// ============================================================================
// Count
// ============================================================================

#[tokio::test]
async fn test_count_recursive() {
    let server = create_test_server();

    let response = server
        .get("/api/count")
        .add_query_param("prefix", "Derecho")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["prefix"], "apuntes/Derecho/");
    assert_eq!(body["totalFiles"], 3);
    assert_eq!(body["recursive"], true);
}

#[tokio::test]
async fn test_count_direct() {
    let server = create_test_server();

    let response = server
        .get("/api/count")
        .add_query_param("prefix", "Derecho")
        .add_query_param("recursive", "false")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["totalFiles"], 1);
    assert_eq!(body["recursive"], false);
}

#[tokio::test]
async fn test_count_whole_root() {
    let server = create_test_server();

    let response = server.get("/api/count").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["totalFiles"], 6);
}

/// Create a test server whose counts stop `max_depth` folder levels down.
fn create_depth_limited_server(max_depth: usize) -> TestServer {
    let mut config = Config::default();
    config.web = create_test_config();
    config.browse.max_depth = max_depth;

    let drive = DriveService::from_config(Arc::new(sample_store()), &config).unwrap();
    let app_state = Arc::new(AppState::new(Arc::new(drive), config.web.environment.clone()));
    TestServer::new(create_router(app_state, &config.web)).expect("Failed to create test server")
}

#[tokio::test]
async fn test_count_depth_exceeded() {
    let server = create_depth_limited_server(1);

    let response = server.get("/api/count").await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"], "DEPTH_EXCEEDED");
    assert!(body.get("totalFiles").is_none());

    // One level below the root is still within the ceiling.
    let response = server
        .get("/api/count")
        .add_query_param("prefix", "Derecho")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["totalFiles"], 3);
}

#[tokio::test]
async fn test_browse_reports_depth_exceeded_per_folder() {
    let server = create_depth_limited_server(0);

    let response = server.get("/api/browse").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["partialFailure"], true);
    assert_eq!(
        body["counts"]["apuntes/Medicina/"]["error"],
        "DEPTH_EXCEEDED"
    );
    assert_eq!(body["counts"]["apuntes/Medicina/"]["totalFiles"], 0);
}

#[tokio::test]
async fn test_count_failure_is_not_zero() {
    let store = sample_store().with_page_size(2).with_failure_after(1);
    let server = create_test_server_with(store, "apuntes/");

    let response = server.get("/api/count").await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"], "STORE_UNAVAILABLE");
    assert!(body.get("totalFiles").is_none());
}

#[tokio::test]
async fn test_count_bad_recursive_flag() {
    let server = create_test_server();

    let response = server
        .get("/api/count")
        .add_query_param("recursive", "maybe")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "BAD_REQUEST");
}

// ============================================================================
// Browse
// ============================================================================

#[tokio::test]
async fn test_browse_counts_each_folder() {
    let server = create_test_server();

    let response = server.get("/api/browse").await;

    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["prefix"], "apuntes/");
    assert_eq!(body["total"], 3);
    assert_eq!(body["partialFailure"], false);
    assert_eq!(body["counts"]["apuntes/Derecho/"]["totalFiles"], 3);
    assert_eq!(body["counts"]["apuntes/Medicina/"]["totalFiles"], 2);
    assert!(body["counts"].get("apuntes/indice.txt").is_none());
}

#[tokio::test]
async fn test_browse_partial_failure() {
    let store = sample_store().with_failing_prefix("apuntes/Derecho/");
    let server = create_test_server_with(store, "apuntes/");

    let response = server.get("/api/browse").await;

    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["partialFailure"], true);
    assert_eq!(body["counts"]["apuntes/Derecho/"]["error"], "STORE_UNAVAILABLE");
    assert_eq!(body["counts"]["apuntes/Derecho/"]["totalFiles"], 0);
    assert_eq!(body["counts"]["apuntes/Medicina/"]["totalFiles"], 2);
    assert!(body["counts"]["apuntes/Medicina/"].get("error").is_none());
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn test_search_in_folder() {
    let server = create_test_server();

    let response = server
        .get("/api/search")
        .add_query_param("prefix", "Medicina")
        .add_query_param("q", "ANAT")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(keys(&body), vec!["apuntes/Medicina/anatomy.pdf"]);
}

#[tokio::test]
async fn test_search_requires_term() {
    let server = create_test_server();

    let response = server
        .get("/api/search")
        .add_query_param("prefix", "Medicina")
        .add_query_param("q", "  ")
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let response = server.get("/api/search").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

// ============================================================================
// Misc
// ============================================================================

#[tokio::test]
async fn test_health() {
    let server = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "OK");
    assert_eq!(body["environment"], "test");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_unknown_route() {
    let server = create_test_server();

    let response = server.get("/api/nothing").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_security_headers_present() {
    let server = create_test_server();

    let response = server.get("/api/list").await;

    response.assert_status_ok();
    assert_eq!(response.header("x-content-type-options"), "nosniff");
    assert_eq!(response.header("x-frame-options"), "DENY");
}

#[tokio::test]
async fn test_rate_limit() {
    let mut config = create_test_config();
    config.api_rate_limit = 2;

    let drive = DriveService::new(Arc::new(sample_store()), PrefixScope::new("apuntes/").unwrap());
    let app_state = Arc::new(AppState::new(Arc::new(drive), "test"));
    let server = TestServer::new(create_router(app_state, &config)).unwrap();

    server.get("/api/list").await.assert_status_ok();
    server.get("/api/list").await.assert_status_ok();

    let response = server.get("/api/list").await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: Value = response.json();
    assert_eq!(body["error"], "TOO_MANY_REQUESTS");

    // Health is not rate limited
    server.get("/health").await.assert_status_ok();
}
