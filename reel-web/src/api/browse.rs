//! Stateful genre browsing
//!
//! Each UI client opens a browse session and drives it with genre selection
//! and next/prev/retry. The session owns a genre browse controller, so window
//! bounds are enforced server-side and a request that is overtaken by a newer
//! one on the same session never overwrites its state.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use reel_catalog::{BrowseSession, BrowseState, CatalogPageMerger, GenreId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::error::{ApiError, ApiResult};
use crate::AppState;

/// Open sessions kept before the oldest is evicted
pub const MAX_BROWSE_SESSIONS: usize = 1024;

#[derive(Default)]
struct Registry {
    sessions: HashMap<Uuid, BrowseSession>,
    /// Creation order, oldest first
    order: VecDeque<Uuid>,
}

/// Registry of open browse sessions
#[derive(Clone)]
pub struct BrowseSessions {
    merger: CatalogPageMerger,
    window_size: u32,
    capacity: usize,
    registry: Arc<Mutex<Registry>>,
}

impl BrowseSessions {
    pub fn new(merger: CatalogPageMerger, window_size: u32) -> Self {
        Self::with_capacity(merger, window_size, MAX_BROWSE_SESSIONS)
    }

    pub fn with_capacity(merger: CatalogPageMerger, window_size: u32, capacity: usize) -> Self {
        Self {
            merger,
            window_size,
            capacity: capacity.max(1),
            registry: Arc::new(Mutex::new(Registry::default())),
        }
    }

    pub async fn open(&self) -> (Uuid, BrowseSession) {
        let id = Uuid::new_v4();
        let session = BrowseSession::new(self.merger.clone(), self.window_size);

        let mut registry = self.registry.lock().await;
        while registry.order.len() >= self.capacity {
            if let Some(oldest) = registry.order.pop_front() {
                registry.sessions.remove(&oldest);
                debug!(session = %oldest, "Evicted oldest browse session");
            }
        }
        registry.sessions.insert(id, session.clone());
        registry.order.push_back(id);
        (id, session)
    }

    pub async fn get(&self, id: Uuid) -> Option<BrowseSession> {
        self.registry.lock().await.sessions.get(&id).cloned()
    }

    pub async fn close(&self, id: Uuid) -> bool {
        let mut registry = self.registry.lock().await;
        registry.order.retain(|open| *open != id);
        registry.sessions.remove(&id).is_some()
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub state: BrowseState,
}

#[derive(Debug, Deserialize)]
pub struct SelectGenre {
    /// `null` leaves genre browsing
    pub genre: Option<u32>,
}

fn parse_session_id(raw: &str) -> ApiResult<Uuid> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid browse session id: {}", raw)))
}

async fn lookup(state: &AppState, raw: &str) -> ApiResult<(Uuid, BrowseSession)> {
    let id = parse_session_id(raw)?;
    let session = state
        .browse
        .get(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("browse session {}", id)))?;
    Ok((id, session))
}

/// POST /api/browse/sessions
pub async fn open_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionResponse>) {
    let (session_id, session) = state.browse.open().await;
    info!(session = %session_id, "Browse session opened");
    let state = session.state().await;
    (StatusCode::CREATED, Json(SessionResponse { session_id, state }))
}

/// GET /api/browse/sessions/:id
pub async fn session_state(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionResponse>> {
    let (session_id, session) = lookup(&state, &id).await?;
    Ok(Json(SessionResponse { session_id, state: session.state().await }))
}

/// PUT /api/browse/sessions/:id/genre
pub async fn select_genre(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SelectGenre>,
) -> ApiResult<Json<SessionResponse>> {
    let (session_id, session) = lookup(&state, &id).await?;
    let state = match body.genre {
        Some(genre) => session.set_genre(GenreId(genre)).await,
        None => session.clear_genre().await,
    };
    Ok(Json(SessionResponse { session_id, state }))
}

/// POST /api/browse/sessions/:id/next
pub async fn next_window(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionResponse>> {
    let (session_id, session) = lookup(&state, &id).await?;
    Ok(Json(SessionResponse { session_id, state: session.next_page().await }))
}

/// POST /api/browse/sessions/:id/prev
pub async fn prev_window(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionResponse>> {
    let (session_id, session) = lookup(&state, &id).await?;
    Ok(Json(SessionResponse { session_id, state: session.prev_page().await }))
}

/// POST /api/browse/sessions/:id/retry
pub async fn retry_window(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionResponse>> {
    let (session_id, session) = lookup(&state, &id).await?;
    Ok(Json(SessionResponse { session_id, state: session.retry().await }))
}

/// DELETE /api/browse/sessions/:id
pub async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_session_id(&id)?;
    if state.browse.close(id).await {
        debug!(session = %id, "Browse session closed");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("browse session {}", id)))
    }
}
