//! Scripted catalog fakes shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use reel_catalog::{
    CatalogError, CatalogItem, CatalogQuery, CatalogSource, MovieDetails, MovieLookup,
    UpstreamPage, WatchProvider,
};
use reel_common::MovieId;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

/// Paged source with a fixed total, optional failing and slow pages
pub struct ScriptedSource {
    pub page_size: u32,
    pub total_results: u64,
    pub failing_pages: HashSet<u32>,
    pub slow_pages: HashMap<u32, Duration>,
    /// Per-query delay, used to hold one genre's response back
    pub slow_queries: HashMap<CatalogQuery, Duration>,
    requests: Mutex<Vec<(CatalogQuery, u32)>>,
}

impl ScriptedSource {
    pub fn new(page_size: u32, total_results: u64) -> Self {
        Self {
            page_size,
            total_results,
            failing_pages: HashSet::new(),
            slow_pages: HashMap::new(),
            slow_queries: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self, pages: &[u32]) -> Self {
        self.failing_pages.extend(pages.iter().copied());
        self
    }

    pub fn slow(mut self, page: u32, delay: Duration) -> Self {
        self.slow_pages.insert(page, delay);
        self
    }

    pub fn slow_query(mut self, query: CatalogQuery, delay: Duration) -> Self {
        self.slow_queries.insert(query, delay);
        self
    }

    /// Pages requested so far, sorted
    pub fn requested_pages(&self) -> Vec<u32> {
        let mut pages: Vec<u32> = self.requests.lock().unwrap().iter().map(|(_, p)| *p).collect();
        pages.sort_unstable();
        pages
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

/// Item ids encode their upstream position: page 2 item 0 of size 20 is id 21
pub fn item(id: u64) -> CatalogItem {
    CatalogItem {
        id: MovieId(id),
        title: format!("Movie {}", id),
        overview: String::new(),
        poster_path: None,
        release_date: None,
        vote_average: None,
    }
}

#[async_trait]
impl CatalogSource for ScriptedSource {
    fn page_size(&self) -> u32 {
        self.page_size
    }

    async fn fetch_page(
        &self,
        query: &CatalogQuery,
        page: u32,
    ) -> Result<UpstreamPage, CatalogError> {
        self.requests.lock().unwrap().push((query.clone(), page));

        if let Some(delay) = self.slow_queries.get(query) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(delay) = self.slow_pages.get(&page) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing_pages.contains(&page) {
            return Err(CatalogError::Upstream { status: 503, message: "unavailable".into() });
        }

        let start = u64::from(page - 1) * u64::from(self.page_size);
        let end = (start + u64::from(self.page_size)).min(self.total_results);
        let items = (start..end).map(|i| item(i + 1)).collect();

        Ok(UpstreamPage { page, items, total_results: self.total_results })
    }
}

/// By-id lookup over a fixed set of titles
#[derive(Default)]
pub struct FakeLookup {
    pub titles: HashMap<u64, String>,
    pub failing: HashSet<u64>,
    pub providers: HashMap<u64, Vec<WatchProvider>>,
}

impl FakeLookup {
    pub fn with(titles: &[(u64, &str)]) -> Self {
        Self {
            titles: titles.iter().map(|(id, t)| (*id, t.to_string())).collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl MovieLookup for FakeLookup {
    async fn movie_details(&self, id: MovieId) -> Result<Option<MovieDetails>, CatalogError> {
        if self.failing.contains(&id.0) {
            return Err(CatalogError::Network("connection reset".into()));
        }
        Ok(self.titles.get(&id.0).map(|title| MovieDetails {
            id,
            title: title.clone(),
            overview: String::new(),
            poster_path: None,
            release_date: None,
            runtime_minutes: None,
            genres: Vec::new(),
        }))
    }

    async fn watch_providers(&self, id: MovieId) -> Result<Vec<WatchProvider>, CatalogError> {
        Ok(self.providers.get(&id.0).cloned().unwrap_or_default())
    }
}
