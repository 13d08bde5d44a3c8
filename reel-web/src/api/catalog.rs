//! Catalog endpoints: landing page, genre browsing, search, movie pages

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use reel_catalog::{
    CatalogError, CatalogItem, CatalogQuery, GenreId, HomeSnapshot, MovieDetails, PageFailure,
    WatchProvider,
};
use reel_common::MovieId;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::{ApiError, ApiResult};
use crate::AppState;

/// Largest window a client may ask for
pub const MAX_WINDOW_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct BrowseParams {
    pub genre: Option<u32>,
    #[serde(default = "default_page")]
    pub page: u32,
    pub size: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    #[serde(default = "default_page")]
    pub page: u32,
    pub size: Option<u32>,
}

fn default_page() -> u32 {
    1
}

/// One window as returned to the browse and search views
#[derive(Debug, Serialize)]
pub struct WindowResponse {
    pub query: String,
    pub page: u32,
    pub window_size: u32,
    pub items: Vec<CatalogItem>,
    /// Absent when any upstream page failed
    pub total_windows: Option<u32>,
    pub partial: bool,
    pub failed_pages: Vec<PageFailure>,
    /// Set whenever the client should offer a retry
    pub error: Option<String>,
}

/// GET /api/home
pub async fn home(State(state): State<AppState>) -> Json<HomeSnapshot> {
    Json(state.home.load().await)
}

/// GET /api/browse?genre=&page=&size=
///
/// Without a genre this is the unfiltered popular listing.
pub async fn browse(State(state): State<AppState>, Query(params): Query<BrowseParams>) -> Response {
    let query = match params.genre {
        Some(genre) => CatalogQuery::Genre(GenreId(genre)),
        None => CatalogQuery::Popular,
    };
    fetch_window(&state, query, params.page, params.size).await
}

/// GET /api/search?query=&page=&size=
pub async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    fetch_window(&state, CatalogQuery::Search(params.query), params.page, params.size).await
}

async fn fetch_window(state: &AppState, query: CatalogQuery, page: u32, size: Option<u32>) -> Response {
    let page = page.max(1);
    let window_size = size.unwrap_or(state.window_size).clamp(1, MAX_WINDOW_SIZE);
    let label = query.to_string();

    match state.catalog.fetch_window(&query, page, window_size).await {
        Ok(window) => {
            let partial = window.is_partial();
            let error = partial.then(|| {
                format!("{} of the upstream pages failed", window.failed_pages.len())
            });
            Json(WindowResponse {
                query: label,
                page,
                window_size,
                items: window.items,
                total_windows: window.total_windows,
                partial,
                failed_pages: window.failed_pages,
                error,
            })
            .into_response()
        }
        Err(CatalogError::AllPagesFailed { failures }) => {
            info!(query = %label, page, "Catalog window unavailable");
            let message = format!("all {} upstream pages failed", failures.len());
            let body = WindowResponse {
                query: label,
                page,
                window_size,
                items: Vec::new(),
                total_windows: None,
                partial: false,
                failed_pages: failures,
                error: Some(message),
            };
            (StatusCode::BAD_GATEWAY, Json(body)).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// GET /api/movies/:id
pub async fn movie(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<MovieDetails>> {
    state
        .movies
        .movie_details(MovieId(id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("movie {}", id)))
}

/// GET /api/movies/:id/providers
pub async fn providers(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<Vec<WatchProvider>>> {
    Ok(Json(state.movies.watch_providers(MovieId(id)).await?))
}
