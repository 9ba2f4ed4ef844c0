//! Drive handlers: listing, counting, browsing and searching folders.

use std::sync::Arc;

use axum::{extract::State, Json};
use tokio_util::sync::CancellationToken;

use super::AppState;
use crate::drive::Listing;
use crate::web::dto::{
    BrowseResponse, CountQuery, CountResponse, EntryResponse, ListQuery, ListResponse,
    SearchQuery, ValidatedQuery,
};
use crate::web::error::{ApiError, ErrorBody};

/// Convert a listing into its response, attaching download URLs and breadcrumbs.
fn list_response(state: &AppState, listing: Listing) -> ListResponse {
    let breadcrumbs = state
        .drive
        .breadcrumbs(&listing.prefix)
        .into_iter()
        .map(Into::into)
        .collect();

    let entries: Vec<EntryResponse> = listing
        .entries
        .into_iter()
        .map(|entry| {
            let url = if entry.is_folder() {
                None
            } else {
                state.drive.file_url(&entry.key)
            };
            EntryResponse::from_entry(entry, url)
        })
        .collect();

    ListResponse {
        total: entries.len(),
        entries,
        prefix: listing.prefix,
        breadcrumbs,
    }
}

/// GET /api/list - List the folders and files directly inside a folder.
#[utoipa::path(
    get,
    path = "/api/list",
    tag = "drive",
    params(
        ("prefix" = Option<String>, Query, description = "Folder path; empty for the root")
    ),
    responses(
        (status = 200, description = "Folder contents, folders first", body = ListResponse),
        (status = 400, description = "Invalid prefix", body = ErrorBody),
        (status = 422, description = "Validation error", body = ErrorBody),
        (status = 500, description = "Store unavailable", body = ErrorBody)
    )
)]
pub async fn list_entries(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let listing = state.drive.list(&query.prefix).await?;
    Ok(Json(list_response(&state, listing)))
}

/// GET /api/count - Count the files under a folder.
#[utoipa::path(
    get,
    path = "/api/count",
    tag = "drive",
    params(
        ("prefix" = Option<String>, Query, description = "Folder path; empty for the root"),
        ("recursive" = Option<bool>, Query, description = "Include nested folders (default true)")
    ),
    responses(
        (status = 200, description = "File count", body = CountResponse),
        (status = 400, description = "Invalid prefix", body = ErrorBody),
        (status = 422, description = "Validation error", body = ErrorBody),
        (status = 500, description = "Store unavailable or depth limit exceeded", body = ErrorBody)
    )
)]
pub async fn count_files(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<CountQuery>,
) -> Result<Json<CountResponse>, ApiError> {
    let (prefix, count) = state.drive.count(&query.prefix, query.recursive).await?;
    Ok(Json(CountResponse {
        prefix,
        total_files: count.total_files,
        recursive: count.recursive,
    }))
}

/// GET /api/browse - List a folder with the recursive file count of each child folder.
///
/// Per-folder failures are reported in `counts` and flagged with
/// `partialFailure`; only a failed listing fails the request.
#[utoipa::path(
    get,
    path = "/api/browse",
    tag = "drive",
    params(
        ("prefix" = Option<String>, Query, description = "Folder path; empty for the root")
    ),
    responses(
        (status = 200, description = "Folder contents with folder counts", body = BrowseResponse),
        (status = 400, description = "Invalid prefix", body = ErrorBody),
        (status = 422, description = "Validation error", body = ErrorBody),
        (status = 500, description = "Store unavailable", body = ErrorBody)
    )
)]
pub async fn browse_folder(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<ListQuery>,
) -> Result<Json<BrowseResponse>, ApiError> {
    // Dropped with this future when the client goes away, stopping the counts.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let browse = state.drive.browse(&query.prefix, &cancel).await?;
    let listing = list_response(&state, browse.listing);
    Ok(Json(BrowseResponse::new(listing, browse.counts)))
}

/// GET /api/search - Find entries of a folder by name.
#[utoipa::path(
    get,
    path = "/api/search",
    tag = "drive",
    params(
        ("prefix" = Option<String>, Query, description = "Folder path; empty for the root"),
        ("q" = String, Query, description = "Case-insensitive name fragment")
    ),
    responses(
        (status = 200, description = "Matching entries", body = ListResponse),
        (status = 400, description = "Invalid prefix or missing term", body = ErrorBody),
        (status = 422, description = "Validation error", body = ErrorBody),
        (status = 500, description = "Store unavailable", body = ErrorBody)
    )
)]
pub async fn search_entries(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<SearchQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let listing = state.drive.search(&query.prefix, &query.q).await?;
    Ok(Json(list_response(&state, listing)))
}
