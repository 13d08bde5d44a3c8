//! Seams to the upstream movie catalog
//!
//! The merger and the review profile view only see these traits, so tests can
//! substitute scripted sources for the HTTP client.

use async_trait::async_trait;
use reel_common::MovieId;

use crate::error::CatalogError;
use crate::models::{CatalogQuery, MovieDetails, UpstreamPage, WatchProvider};

/// A paginated upstream listing with a fixed, source-defined page size
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Items per upstream page
    fn page_size(&self) -> u32;

    /// Fetch one upstream page (1-based)
    async fn fetch_page(&self, query: &CatalogQuery, page: u32)
        -> Result<UpstreamPage, CatalogError>;
}

/// By-id lookups against the upstream catalog
#[async_trait]
pub trait MovieLookup: Send + Sync {
    /// `Ok(None)` when the upstream no longer knows the movie
    async fn movie_details(&self, id: MovieId) -> Result<Option<MovieDetails>, CatalogError>;

    /// Subscription offers in the configured region
    async fn watch_providers(&self, id: MovieId) -> Result<Vec<WatchProvider>, CatalogError>;
}
