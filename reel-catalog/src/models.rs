//! Catalog data shapes
//!
//! Nothing here is persisted: pages and windows are rebuilt from upstream
//! responses on every request.

use reel_common::MovieId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upstream genre identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenreId(pub u32);

impl fmt::Display for GenreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Which paginated upstream listing to read
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CatalogQuery {
    /// Unfiltered popularity listing
    Popular,
    /// Discover-by-genre listing
    Genre(GenreId),
    /// Free-text title search
    Search(String),
}

impl CatalogQuery {
    /// Reject queries that cannot produce a meaningful upstream request
    pub fn validate(&self) -> Result<(), String> {
        match self {
            CatalogQuery::Search(text) if text.trim().is_empty() => {
                Err("search text must not be empty".to_string())
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for CatalogQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogQuery::Popular => f.write_str("popular"),
            CatalogQuery::Genre(genre) => write!(f, "genre:{}", genre),
            CatalogQuery::Search(text) => write!(f, "search:{}", text),
        }
    }
}

/// One movie as it appears in a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
}

/// One upstream response unit
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamPage {
    /// Page number as reported upstream (1-based)
    pub page: u32,
    pub items: Vec<CatalogItem>,
    /// Total items the upstream reports for the whole listing
    pub total_results: u64,
}

/// Detail record for one movie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetails {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub runtime_minutes: Option<u32>,
    #[serde(default)]
    pub genres: Vec<String>,
}

/// A streaming service currently offering a movie by subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchProvider {
    pub provider_id: u32,
    pub name: String,
    pub logo_path: Option<String>,
    /// Landing page of the service
    pub link: String,
    pub region: String,
}
