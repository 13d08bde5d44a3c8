//! Shared fixtures for review integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use reel_catalog::{CatalogError, MovieDetails, MovieLookup, WatchProvider};
use reel_common::db::{init_in_memory, upsert_role_assignment};
use reel_common::events::{EventBus, ReelEvent};
use reel_common::{MovieId, NewReview, Review, ReviewId, RoleAssignment, UserId};
use reel_reviews::{
    AuthzGate, FeedEntry, ReviewRelation, ReviewStore, SqliteReviewRelation,
    SqliteRoleDirectory, StoreError,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

pub const ADMIN: &str = "root";

/// Store over an in-memory database with `root` provisioned as administrator
pub struct Fixture {
    pub store: ReviewStore,
    pub relation: Arc<SqliteReviewRelation>,
}

pub async fn fixture(movies: FakeMovies) -> Fixture {
    let pool = init_in_memory().await.unwrap();
    upsert_role_assignment(&pool, &RoleAssignment { user_id: UserId::new(ADMIN), is_admin: true })
        .await
        .unwrap();

    let relation = Arc::new(SqliteReviewRelation::new(pool.clone(), EventBus::new(64)));
    let gate = AuthzGate::new(Arc::new(SqliteRoleDirectory::new(pool)));
    let store = ReviewStore::new(relation.clone(), gate, Arc::new(movies));

    Fixture { store, relation }
}

/// Movie lookup resolving only the listed ids
#[derive(Default)]
pub struct FakeMovies {
    pub known: HashSet<u64>,
    pub failing: HashSet<u64>,
}

impl FakeMovies {
    pub fn knowing(ids: &[u64]) -> Self {
        Self { known: ids.iter().copied().collect(), failing: HashSet::new() }
    }
}

#[async_trait]
impl MovieLookup for FakeMovies {
    async fn movie_details(&self, id: MovieId) -> Result<Option<MovieDetails>, CatalogError> {
        if self.failing.contains(&id.0) {
            return Err(CatalogError::Upstream { status: 502, message: "bad gateway".into() });
        }
        Ok(self.known.contains(&id.0).then(|| MovieDetails {
            id,
            title: format!("Movie {}", id),
            overview: String::new(),
            poster_path: None,
            release_date: None,
            runtime_minutes: None,
            genres: Vec::new(),
        }))
    }

    async fn watch_providers(&self, _id: MovieId) -> Result<Vec<WatchProvider>, CatalogError> {
        Ok(Vec::new())
    }
}

/// Relation that counts every call and holds nothing
#[derive(Default)]
pub struct SpyRelation {
    pub calls: AtomicUsize,
}

impl SpyRelation {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReviewRelation for SpyRelation {
    async fn get(&self, _id: ReviewId) -> Result<Option<Review>, StoreError> {
        self.touch();
        Ok(None)
    }

    async fn insert(&self, _review: NewReview) -> Result<Review, StoreError> {
        self.touch();
        Err(StoreError::Unavailable("spy".into()))
    }

    async fn update_text(&self, _id: ReviewId, _text: &str) -> Result<Option<Review>, StoreError> {
        self.touch();
        Ok(None)
    }

    async fn delete(&self, _id: ReviewId) -> Result<bool, StoreError> {
        self.touch();
        Ok(false)
    }

    async fn list_by_subject(&self, _subject: MovieId) -> Result<Vec<Review>, StoreError> {
        self.touch();
        Ok(Vec::new())
    }

    async fn list_by_author(&self, _author: &UserId) -> Result<Vec<Review>, StoreError> {
        self.touch();
        Ok(Vec::new())
    }

    async fn list_all(&self) -> Result<Vec<Review>, StoreError> {
        self.touch();
        Ok(Vec::new())
    }

    fn watch(&self) -> broadcast::Receiver<ReelEvent> {
        self.touch();
        broadcast::channel(1).1
    }
}

/// Relation whose contents and change channel the test drives by hand
pub struct ManualRelation {
    pub reviews: Mutex<Vec<Review>>,
    sender: Mutex<broadcast::Sender<ReelEvent>>,
    capacity: usize,
    pub watches: AtomicUsize,
    failing_reads: AtomicUsize,
}

impl ManualRelation {
    pub fn new(capacity: usize) -> Self {
        Self {
            reviews: Mutex::new(Vec::new()),
            sender: Mutex::new(broadcast::channel(capacity).0),
            capacity,
            watches: AtomicUsize::new(0),
            failing_reads: AtomicUsize::new(0),
        }
    }

    /// Replace the contents and announce a change
    pub fn set_and_notify(&self, reviews: Vec<Review>) {
        let id = reviews.first().map(|r| r.id).unwrap_or_else(ReviewId::generate);
        *self.reviews.lock().unwrap() = reviews;
        self.notify(id);
    }

    pub fn notify(&self, review_id: ReviewId) {
        let _ = self.sender.lock().unwrap().send(ReelEvent::ReviewUpdated {
            review_id,
            subject_id: MovieId(238),
            timestamp: reel_common::time::now(),
        });
    }

    /// Drop the current channel so existing receivers observe `Closed`
    pub fn close_channel(&self) {
        *self.sender.lock().unwrap() = broadcast::channel(self.capacity).0;
    }

    /// Make the next `count` full reads fail
    pub fn fail_next_reads(&self, count: usize) {
        self.failing_reads.store(count, Ordering::SeqCst);
    }

    pub fn watch_count(&self) -> usize {
        self.watches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReviewRelation for ManualRelation {
    async fn get(&self, id: ReviewId) -> Result<Option<Review>, StoreError> {
        Ok(self.reviews.lock().unwrap().iter().find(|r| r.id == id).cloned())
    }

    async fn insert(&self, _review: NewReview) -> Result<Review, StoreError> {
        Err(StoreError::Unavailable("read-only".into()))
    }

    async fn update_text(&self, _id: ReviewId, _text: &str) -> Result<Option<Review>, StoreError> {
        Err(StoreError::Unavailable("read-only".into()))
    }

    async fn delete(&self, _id: ReviewId) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("read-only".into()))
    }

    async fn list_by_subject(&self, subject: MovieId) -> Result<Vec<Review>, StoreError> {
        let reviews = self.reviews.lock().unwrap();
        Ok(reviews.iter().filter(|r| r.subject_id == subject).cloned().collect())
    }

    async fn list_by_author(&self, author: &UserId) -> Result<Vec<Review>, StoreError> {
        let reviews = self.reviews.lock().unwrap();
        Ok(reviews.iter().filter(|r| &r.author_id == author).cloned().collect())
    }

    async fn list_all(&self) -> Result<Vec<Review>, StoreError> {
        let failing = self
            .failing_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(StoreError::Unavailable("read failed".into()));
        }
        Ok(self.reviews.lock().unwrap().clone())
    }

    fn watch(&self) -> broadcast::Receiver<ReelEvent> {
        self.watches.fetch_add(1, Ordering::SeqCst);
        self.sender.lock().unwrap().subscribe()
    }
}

/// Callback that forwards every delivered list to a channel
pub fn forwarding() -> (
    impl FnMut(Vec<FeedEntry>) + Send + 'static,
    mpsc::UnboundedReceiver<Vec<FeedEntry>>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (move |entries| {
        let _ = tx.send(entries);
    }, rx)
}

pub async fn next_update(rx: &mut mpsc::UnboundedReceiver<Vec<FeedEntry>>) -> Vec<FeedEntry> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("feed update within timeout")
        .expect("feed channel open")
}

pub fn assert_newest_first(entries: &[FeedEntry]) {
    for pair in entries.windows(2) {
        assert!(
            pair[0].review.created_at > pair[1].review.created_at,
            "feed out of order: {:?} before {:?}",
            pair[0].review.created_at,
            pair[1].review.created_at
        );
    }
}
