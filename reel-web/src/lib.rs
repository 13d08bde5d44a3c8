//! reel-web library - HTTP surface of the review service
//!
//! Wires the catalog and review crates together and exposes them to the
//! browser UI as JSON endpoints plus one SSE stream for the live feed.

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use reel_catalog::{CatalogPageMerger, CatalogSource, HomeLoader, MovieLookup};
use reel_common::config::TomlConfig;
use reel_common::events::EventBus;
use reel_common::MovieId;
use reel_reviews::{
    AuthzGate, FeedSettings, LiveFeedSubscriber, ReviewStore, SqliteReviewRelation,
    SqliteRoleDirectory,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

pub mod api;

use api::{browse, catalog, reviews, BrowseSessions};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Window merger over the catalog listings
    pub catalog: CatalogPageMerger,
    /// By-id movie lookups
    pub movies: Arc<dyn MovieLookup>,
    pub home: Arc<HomeLoader>,
    /// Open stateful genre browse sessions
    pub browse: BrowseSessions,
    pub reviews: ReviewStore,
    pub feed: LiveFeedSubscriber,
    /// Default browse window size
    pub window_size: u32,
}

impl AppState {
    /// Build the full service graph over one upstream catalog and one database
    pub fn assemble<C>(config: &TomlConfig, upstream: Arc<C>, pool: SqlitePool) -> Self
    where
        C: CatalogSource + MovieLookup + 'static,
    {
        let fetch_timeout = Duration::from_millis(config.tmdb.timeout_ms);
        let catalog = CatalogPageMerger::new(upstream.clone(), fetch_timeout);
        let movies: Arc<dyn MovieLookup> = upstream;

        let curated = config.browse.curated_ids.iter().copied().map(MovieId).collect();
        let home = Arc::new(HomeLoader::new(catalog.clone(), movies.clone(), curated));

        let events = EventBus::new(config.feed.event_capacity.max(1));
        let relation = Arc::new(SqliteReviewRelation::new(pool.clone(), events));
        let gate = AuthzGate::new(Arc::new(SqliteRoleDirectory::new(pool)));
        let reviews = ReviewStore::new(relation.clone(), gate, movies.clone());
        let feed = LiveFeedSubscriber::new(relation, FeedSettings::from(&config.feed));

        let window_size = config.browse.window_size.max(1);
        let browse = BrowseSessions::new(catalog.clone(), window_size);

        Self {
            catalog,
            movies,
            home,
            browse,
            reviews,
            feed,
            window_size,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let catalog_routes = Router::new()
        .route("/api/home", get(catalog::home))
        .route("/api/browse", get(catalog::browse))
        .route("/api/search", get(catalog::search))
        .route("/api/movies/:id", get(catalog::movie))
        .route("/api/movies/:id/providers", get(catalog::providers));

    let browse_routes = Router::new()
        .route("/api/browse/sessions", post(browse::open_session))
        .route(
            "/api/browse/sessions/:id",
            get(browse::session_state).delete(browse::close_session),
        )
        .route("/api/browse/sessions/:id/genre", put(browse::select_genre))
        .route("/api/browse/sessions/:id/next", post(browse::next_window))
        .route("/api/browse/sessions/:id/prev", post(browse::prev_window))
        .route("/api/browse/sessions/:id/retry", post(browse::retry_window));

    let review_routes = Router::new()
        .route(
            "/api/movies/:id/reviews",
            get(reviews::list_for_movie).post(reviews::create),
        )
        .route("/api/reviews/:id", patch(reviews::update).delete(reviews::delete))
        .route("/api/users/:uid/reviews", get(reviews::list_for_user))
        .route("/api/admin/reviews", get(reviews::moderation_list))
        .route("/api/feed", get(api::feed_stream));

    Router::new()
        .merge(catalog_routes)
        .merge(browse_routes)
        .merge(review_routes)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
