//! Landing page sub-flows shown when no genre is selected
//!
//! The popular window and the curated list are independent: they run
//! concurrently and a failure in one never hides the other.

use futures::future::join_all;
use reel_common::MovieId;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::merger::CatalogPageMerger;
use crate::models::{CatalogItem, CatalogQuery, MovieDetails};
use crate::source::MovieLookup;

/// Both landing page lists with their error flags
#[derive(Debug, Clone, Serialize)]
pub struct HomeSnapshot {
    pub popular: Vec<CatalogItem>,
    /// Set when the popular window failed or came back partial
    pub popular_error: Option<String>,
    /// Curated movies in configured order
    pub curated: Vec<MovieDetails>,
    /// Curated ids that failed or no longer resolve
    pub curated_missing: Vec<MovieId>,
}

pub struct HomeLoader {
    merger: CatalogPageMerger,
    lookup: Arc<dyn MovieLookup>,
    curated_ids: Vec<MovieId>,
}

impl HomeLoader {
    pub fn new(
        merger: CatalogPageMerger,
        lookup: Arc<dyn MovieLookup>,
        curated_ids: Vec<MovieId>,
    ) -> Self {
        Self { merger, lookup, curated_ids }
    }

    pub async fn load(&self) -> HomeSnapshot {
        let ((popular, popular_error), (curated, curated_missing)) =
            tokio::join!(self.load_popular(), self.load_curated());

        HomeSnapshot { popular, popular_error, curated, curated_missing }
    }

    /// First upstream page of the unfiltered listing
    pub async fn load_popular(&self) -> (Vec<CatalogItem>, Option<String>) {
        let size = self.merger.page_size();
        match self.merger.fetch_window(&CatalogQuery::Popular, 1, size).await {
            Ok(window) if window.is_partial() => {
                let pages: Vec<u32> = window.failed_pages.iter().map(|f| f.page).collect();
                (window.items, Some(format!("upstream pages {:?} failed", pages)))
            }
            Ok(window) => (window.items, None),
            Err(e) => {
                warn!(error = %e, "Popular listing unavailable");
                (Vec::new(), Some(e.to_string()))
            }
        }
    }

    /// Curated movies fetched concurrently by id
    pub async fn load_curated(&self) -> (Vec<MovieDetails>, Vec<MovieId>) {
        let lookups = self.curated_ids.iter().map(|id| self.lookup.movie_details(*id));
        let results = join_all(lookups).await;

        let mut found = Vec::with_capacity(results.len());
        let mut missing = Vec::new();
        for (id, result) in self.curated_ids.iter().zip(results) {
            match result {
                Ok(Some(details)) => found.push(details),
                Ok(None) => {
                    debug!(movie_id = %id, "Curated movie no longer resolves");
                    missing.push(*id);
                }
                Err(e) => {
                    warn!(movie_id = %id, error = %e, "Curated movie lookup failed");
                    missing.push(*id);
                }
            }
        }
        (found, missing)
    }
}
