//! Genre browsing state machine
//!
//! [`GenreBrowseController`] is pure: each transition updates the state and
//! returns at most one [`FetchRequest`] for the caller to execute. Responses
//! come back through [`GenreBrowseController::apply`] tagged with the request
//! sequence number; anything but the latest sequence is discarded.
//!
//! [`BrowseSession`] drives a controller against a [`CatalogPageMerger`] and
//! cancels the in-flight fetch whenever a newer request replaces it.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{CatalogError, PageFailure};
use crate::merger::{CatalogPageMerger, CatalogWindow};
use crate::models::{CatalogItem, CatalogQuery, GenreId};

/// Outcome of the latest fetch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    /// Some upstream pages failed; items are the ones that arrived
    Partial { failed_pages: Vec<PageFailure> },
    /// Nothing arrived; items are empty and a retry is expected
    Failed { reason: String },
}

impl LoadStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, LoadStatus::Partial { .. } | LoadStatus::Failed { .. })
    }
}

/// Observable browse state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrowseState {
    pub genre: Option<GenreId>,
    /// 1-based
    pub current_window: u32,
    /// 0 until a complete window has been loaded for the genre
    pub total_windows: u32,
    pub items: Vec<CatalogItem>,
    pub status: LoadStatus,
}

/// A window fetch the caller must execute
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub seq: u64,
    pub query: CatalogQuery,
    pub window_index: u32,
    pub window_size: u32,
}

pub struct GenreBrowseController {
    state: BrowseState,
    window_size: u32,
    last_seq: u64,
    /// Sequence whose response is still awaited
    pending: Option<u64>,
}

impl GenreBrowseController {
    pub fn new(window_size: u32) -> Self {
        Self {
            state: BrowseState {
                genre: None,
                current_window: 1,
                total_windows: 0,
                items: Vec::new(),
                status: LoadStatus::Idle,
            },
            window_size: window_size.max(1),
            last_seq: 0,
            pending: None,
        }
    }

    pub fn state(&self) -> &BrowseState {
        &self.state
    }

    /// Select a genre and return to its first window
    pub fn set_genre(&mut self, genre: GenreId) -> FetchRequest {
        self.state.genre = Some(genre);
        self.state.current_window = 1;
        self.state.total_windows = 0;
        self.state.items.clear();
        self.issue(genre)
    }

    /// Leave genre browsing; outstanding responses are ignored
    pub fn clear_genre(&mut self) {
        self.state.genre = None;
        self.state.current_window = 1;
        self.state.total_windows = 0;
        self.state.items.clear();
        self.state.status = LoadStatus::Idle;
        self.pending = None;
    }

    /// Advance one window; `None` at the last window or without a genre
    pub fn next_page(&mut self) -> Option<FetchRequest> {
        let genre = self.state.genre?;
        if self.state.current_window >= self.state.total_windows {
            return None;
        }
        self.state.current_window += 1;
        Some(self.issue(genre))
    }

    /// Go back one window; `None` at the first window or without a genre
    pub fn prev_page(&mut self) -> Option<FetchRequest> {
        let genre = self.state.genre?;
        if self.state.current_window <= 1 {
            return None;
        }
        self.state.current_window = (self.state.current_window - 1).min(self.state.total_windows.max(1));
        Some(self.issue(genre))
    }

    /// Re-issue the current window
    pub fn retry(&mut self) -> Option<FetchRequest> {
        let genre = self.state.genre?;
        Some(self.issue(genre))
    }

    /// Whether `seq` is the response the controller is waiting for
    pub fn is_current(&self, seq: u64) -> bool {
        self.pending == Some(seq)
    }

    /// Fold a fetch result into the state
    ///
    /// Returns false when the result was stale and dropped.
    pub fn apply(&mut self, seq: u64, result: Result<CatalogWindow, CatalogError>) -> bool {
        if !self.is_current(seq) {
            debug!(seq, pending = ?self.pending, "Discarding stale browse response");
            return false;
        }
        if matches!(result, Err(CatalogError::Superseded)) {
            return false;
        }
        self.pending = None;

        match result {
            Ok(window) if window.is_partial() => {
                // Keep the last complete total; this one came from incomplete data
                self.state.items = window.items;
                self.state.status = LoadStatus::Partial { failed_pages: window.failed_pages };
            }
            Ok(window) => {
                self.state.items = window.items;
                self.state.total_windows = window.total_windows.unwrap_or(0);
                self.state.status = LoadStatus::Ready;
            }
            Err(e) => {
                self.state.items.clear();
                self.state.status = LoadStatus::Failed { reason: e.to_string() };
            }
        }
        true
    }

    fn issue(&mut self, genre: GenreId) -> FetchRequest {
        self.last_seq += 1;
        self.pending = Some(self.last_seq);
        self.state.status = LoadStatus::Loading;
        FetchRequest {
            seq: self.last_seq,
            query: CatalogQuery::Genre(genre),
            window_index: self.state.current_window,
            window_size: self.window_size,
        }
    }
}

struct SessionInner {
    controller: GenreBrowseController,
    in_flight: Option<(u64, CancellationToken)>,
}

/// Async driver for one browsing user
#[derive(Clone)]
pub struct BrowseSession {
    merger: CatalogPageMerger,
    inner: Arc<Mutex<SessionInner>>,
}

impl BrowseSession {
    pub fn new(merger: CatalogPageMerger, window_size: u32) -> Self {
        Self {
            merger,
            inner: Arc::new(Mutex::new(SessionInner {
                controller: GenreBrowseController::new(window_size),
                in_flight: None,
            })),
        }
    }

    pub async fn state(&self) -> BrowseState {
        self.inner.lock().await.controller.state().clone()
    }

    pub async fn set_genre(&self, genre: GenreId) -> BrowseState {
        info!(genre = %genre, "Browsing genre");
        self.run(|c| Some(c.set_genre(genre))).await
    }

    pub async fn next_page(&self) -> BrowseState {
        self.run(GenreBrowseController::next_page).await
    }

    pub async fn prev_page(&self) -> BrowseState {
        self.run(GenreBrowseController::prev_page).await
    }

    pub async fn retry(&self) -> BrowseState {
        self.run(GenreBrowseController::retry).await
    }

    pub async fn clear_genre(&self) -> BrowseState {
        let mut inner = self.inner.lock().await;
        if let Some((_, token)) = inner.in_flight.take() {
            token.cancel();
        }
        inner.controller.clear_genre();
        inner.controller.state().clone()
    }

    async fn run<F>(&self, transition: F) -> BrowseState
    where
        F: FnOnce(&mut GenreBrowseController) -> Option<FetchRequest>,
    {
        // Issue the request and swap the cancellation token under one lock
        let (request, token) = {
            let mut inner = self.inner.lock().await;
            let Some(request) = transition(&mut inner.controller) else {
                return inner.controller.state().clone();
            };
            let token = CancellationToken::new();
            if let Some((old_seq, old)) = inner.in_flight.replace((request.seq, token.clone())) {
                debug!(old_seq, new_seq = request.seq, "Superseding in-flight browse fetch");
                old.cancel();
            }
            (request, token)
        };

        let result = tokio::select! {
            _ = token.cancelled() => Err(CatalogError::Superseded),
            r = self.merger.fetch_window(&request.query, request.window_index, request.window_size) => r,
        };

        let mut inner = self.inner.lock().await;
        inner.controller.apply(request.seq, result);
        if matches!(inner.in_flight, Some((seq, _)) if seq == request.seq) {
            inner.in_flight = None;
        }
        inner.controller.state().clone()
    }
}
