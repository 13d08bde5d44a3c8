//! TMDB REST client
//!
//! Implements [`CatalogSource`] and [`MovieLookup`] against the v3 API with a
//! bearer credential. Requests are rate limited with a token bucket and each
//! one is bounded by the configured timeout.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reel_common::config::TmdbConfig;
use reel_common::MovieId;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::time::Duration;

use crate::error::CatalogError;
use crate::models::{CatalogItem, CatalogQuery, MovieDetails, UpstreamPage, WatchProvider};
use crate::source::{CatalogSource, MovieLookup};

/// Items per page on every TMDB list endpoint
pub const TMDB_PAGE_SIZE: u32 = 20;

const USER_AGENT: &str = concat!("Reel/", env!("CARGO_PKG_VERSION"));

/// Subscription services shown on movie pages, with their landing pages
pub const KNOWN_PROVIDERS: &[(&str, &str)] = &[
    ("Netflix", "https://www.netflix.com/"),
    ("Disney Plus", "https://www.disneyplus.com/"),
    ("Amazon Prime Video", "https://www.amazon.co.jp/gp/video/storefront"),
    ("U-NEXT", "https://video.unext.jp/"),
    ("Hulu", "https://www.hulu.jp/"),
    ("Apple TV+", "https://tv.apple.com/"),
    ("dTV", "https://lemino.docomo.ne.jp/"),
    ("Rakuten TV", "https://tv.rakuten.co.jp/"),
    ("WOWOW", "https://www.wowow.co.jp/"),
];

// ========================================
// Wire formats
// ========================================

#[derive(Debug, Deserialize)]
struct TmdbListPage {
    page: u32,
    #[serde(default)]
    results: Vec<TmdbListItem>,
    #[serde(default)]
    total_results: u64,
}

#[derive(Debug, Deserialize)]
struct TmdbListItem {
    id: u64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    poster_path: Option<String>,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    vote_average: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovie {
    id: u64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    poster_path: Option<String>,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    runtime: Option<u32>,
    #[serde(default)]
    genres: Vec<TmdbGenre>,
}

#[derive(Debug, Deserialize)]
struct TmdbGenre {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TmdbProvidersResponse {
    #[serde(default)]
    results: HashMap<String, TmdbRegionOffers>,
}

#[derive(Debug, Deserialize)]
struct TmdbRegionOffers {
    #[serde(default)]
    flatrate: Vec<TmdbProvider>,
}

#[derive(Debug, Deserialize)]
struct TmdbProvider {
    provider_id: u32,
    provider_name: String,
    #[serde(default)]
    logo_path: Option<String>,
}

// ========================================
// Client
// ========================================

/// TMDB API client
pub struct TmdbClient {
    client: Client,
    base_url: String,
    access_token: String,
    language: String,
    region: String,
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl TmdbClient {
    /// Build a client from configuration and a resolved bearer credential
    pub fn new(config: &TmdbConfig, access_token: String) -> Result<Self, CatalogError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .build()
            .map_err(|e| CatalogError::Network(format!("Failed to build HTTP client: {}", e)))?;

        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(per_second));

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token,
            language: config.language.clone(),
            region: config.region.clone(),
            rate_limiter,
        })
    }

    /// Region whose offers `watch_providers` returns
    pub fn region(&self) -> &str {
        &self.region
    }

    /// GET `path` and decode the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, CatalogError> {
        // Wait for a token so bursts from concurrent window fetches stay under quota
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "Querying catalog API");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .header("accept", "application/json")
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(url = %url, status = status.as_u16(), "Catalog API returned error status");
            return Err(CatalogError::Upstream { status: status.as_u16(), message });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CatalogError::Parse(format!("{}: {}", path, e)))
    }

    fn list_request(&self, query: &CatalogQuery, page: u32) -> (&'static str, Vec<(&'static str, String)>) {
        let mut params = vec![("language", self.language.clone()), ("page", page.to_string())];
        let path = match query {
            CatalogQuery::Popular => "/movie/popular",
            CatalogQuery::Genre(genre) => {
                params.push(("with_genres", genre.to_string()));
                params.push(("sort_by", "popularity.desc".to_string()));
                "/discover/movie"
            }
            CatalogQuery::Search(text) => {
                params.push(("query", text.trim().to_string()));
                params.push(("include_adult", "false".to_string()));
                "/search/movie"
            }
        };
        (path, params)
    }
}

#[async_trait]
impl CatalogSource for TmdbClient {
    fn page_size(&self) -> u32 {
        TMDB_PAGE_SIZE
    }

    async fn fetch_page(
        &self,
        query: &CatalogQuery,
        page: u32,
    ) -> Result<UpstreamPage, CatalogError> {
        let (path, params) = self.list_request(query, page);
        let body: TmdbListPage = self.get_json(path, &params).await?;
        Ok(list_page_from_wire(body))
    }
}

#[async_trait]
impl MovieLookup for TmdbClient {
    async fn movie_details(&self, id: MovieId) -> Result<Option<MovieDetails>, CatalogError> {
        let path = format!("/movie/{}", id);
        match self.get_json::<TmdbMovie>(&path, &[("language", self.language.clone())]).await {
            Ok(movie) => Ok(details_from_wire(movie)),
            Err(CatalogError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn watch_providers(&self, id: MovieId) -> Result<Vec<WatchProvider>, CatalogError> {
        let path = format!("/movie/{}/watch/providers", id);
        match self.get_json::<TmdbProvidersResponse>(&path, &[]).await {
            Ok(body) => Ok(providers_for_region(body, &self.region)),
            Err(CatalogError::NotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

// ========================================
// Wire → domain conversion
// ========================================

fn list_page_from_wire(body: TmdbListPage) -> UpstreamPage {
    let items = body
        .results
        .into_iter()
        .map(|item| CatalogItem {
            id: MovieId(item.id),
            title: item.title.unwrap_or_default(),
            overview: item.overview.unwrap_or_default(),
            poster_path: item.poster_path,
            release_date: item.release_date.filter(|d| !d.is_empty()),
            vote_average: item.vote_average,
        })
        .collect();

    UpstreamPage {
        page: body.page,
        items,
        total_results: body.total_results,
    }
}

/// A movie without a title cannot be shown and counts as unresolved
fn details_from_wire(movie: TmdbMovie) -> Option<MovieDetails> {
    let title = movie.title.filter(|t| !t.trim().is_empty())?;
    Some(MovieDetails {
        id: MovieId(movie.id),
        title,
        overview: movie.overview.unwrap_or_default(),
        poster_path: movie.poster_path,
        release_date: movie.release_date.filter(|d| !d.is_empty()),
        runtime_minutes: movie.runtime,
        genres: movie.genres.into_iter().map(|g| g.name).collect(),
    })
}

fn providers_for_region(body: TmdbProvidersResponse, region: &str) -> Vec<WatchProvider> {
    let Some(offers) = body.results.get(region) else {
        return Vec::new();
    };

    offers
        .flatrate
        .iter()
        .filter_map(|p| {
            let link = provider_link(&p.provider_name)?;
            Some(WatchProvider {
                provider_id: p.provider_id,
                name: p.provider_name.clone(),
                logo_path: p.logo_path.clone(),
                link: link.to_string(),
                region: region.to_string(),
            })
        })
        .collect()
}

/// Landing page for a known provider name
pub fn provider_link(name: &str) -> Option<&'static str> {
    KNOWN_PROVIDERS
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, link)| *link)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GenreId;

    fn client() -> TmdbClient {
        TmdbClient::new(&TmdbConfig::default(), "token".to_string()).unwrap()
    }

    #[test]
    fn test_list_page_parsing() {
        let body: TmdbListPage = serde_json::from_str(
            r#"{
                "page": 2,
                "results": [
                    {"id": 238, "title": "The Godfather", "overview": "...", "poster_path": "/p.jpg", "release_date": "1972-03-14", "vote_average": 8.7},
                    {"id": 11, "title": "Star Wars", "release_date": ""}
                ],
                "total_pages": 500,
                "total_results": 10000
            }"#,
        )
        .unwrap();

        let page = list_page_from_wire(body);

        assert_eq!(page.page, 2);
        assert_eq!(page.total_results, 10000);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id, MovieId(238));
        assert_eq!(page.items[1].release_date, None);
        assert_eq!(page.items[1].overview, "");
    }

    #[test]
    fn test_details_without_title_are_unresolved() {
        let movie: TmdbMovie = serde_json::from_str(r#"{"id": 5, "overview": "x"}"#).unwrap();
        assert!(details_from_wire(movie).is_none());

        let movie: TmdbMovie = serde_json::from_str(
            r#"{"id": 155, "title": "The Dark Knight", "runtime": 152, "genres": [{"id": 28, "name": "Action"}]}"#,
        )
        .unwrap();
        let details = details_from_wire(movie).unwrap();
        assert_eq!(details.runtime_minutes, Some(152));
        assert_eq!(details.genres, vec!["Action".to_string()]);
    }

    #[test]
    fn test_providers_filtered_by_region_and_allow_list() {
        let body: TmdbProvidersResponse = serde_json::from_str(
            r#"{
                "id": 278,
                "results": {
                    "JP": {"flatrate": [
                        {"provider_id": 8, "provider_name": "Netflix", "logo_path": "/n.png"},
                        {"provider_id": 999, "provider_name": "Obscure Stream"}
                    ], "rent": [{"provider_id": 2, "provider_name": "Apple TV"}]},
                    "US": {"flatrate": [{"provider_id": 15, "provider_name": "Hulu"}]}
                }
            }"#,
        )
        .unwrap();

        let providers = providers_for_region(body, "JP");

        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].name, "Netflix");
        assert_eq!(providers[0].link, "https://www.netflix.com/");
        assert_eq!(providers[0].region, "JP");
    }

    #[test]
    fn test_providers_missing_region_is_empty() {
        let body: TmdbProvidersResponse = serde_json::from_str(r#"{"id": 1, "results": {}}"#).unwrap();
        assert!(providers_for_region(body, "JP").is_empty());
    }

    #[test]
    fn test_list_request_paths() {
        let client = client();

        let (path, params) = client.list_request(&CatalogQuery::Genre(GenreId(28)), 3);
        assert_eq!(path, "/discover/movie");
        assert!(params.contains(&("with_genres", "28".to_string())));
        assert!(params.contains(&("page", "3".to_string())));

        let (path, params) = client.list_request(&CatalogQuery::Search("  akira ".into()), 1);
        assert_eq!(path, "/search/movie");
        assert!(params.contains(&("query", "akira".to_string())));

        let (path, _) = client.list_request(&CatalogQuery::Popular, 1);
        assert_eq!(path, "/movie/popular");
    }

    #[test]
    fn test_zero_rate_falls_back_to_one_per_second() {
        let config = TmdbConfig { requests_per_second: 0, ..TmdbConfig::default() };
        assert!(TmdbClient::new(&config, "token".to_string()).is_ok());
    }
}
