//! Review CRUD through the gate against an in-memory database

mod support;

use reel_common::{MovieId, ReviewId, UserId};
use reel_reviews::{
    Actor, AuthzGate, DenyReason, ReviewError, ReviewRelation, ReviewStore, SqliteRoleDirectory,
    ValidationError,
};
use std::sync::Arc;
use support::{fixture, FakeMovies, SpyRelation, ADMIN};

const GODFATHER: MovieId = MovieId(238);
const STAR_WARS: MovieId = MovieId(11);

#[tokio::test]
async fn test_out_of_range_rating_never_reaches_store() {
    let pool = reel_common::db::init_in_memory().await.unwrap();
    let spy = Arc::new(SpyRelation::default());
    let store = ReviewStore::new(
        spy.clone(),
        AuthzGate::new(Arc::new(SqliteRoleDirectory::new(pool))),
        Arc::new(FakeMovies::default()),
    );

    let err = store
        .create(&Actor::user("alice"), GODFATHER, "Masterpiece", 6)
        .await
        .unwrap_err();

    assert!(matches!(err, ReviewError::Validation(ValidationError::RatingOutOfRange(6))));
    assert_eq!(spy.calls(), 0);

    let err = store.create(&Actor::user("alice"), GODFATHER, "   ", 5).await.unwrap_err();
    assert!(matches!(err, ReviewError::Validation(ValidationError::EmptyText)));
    assert_eq!(spy.calls(), 0);
}

#[tokio::test]
async fn test_create_then_list_newest_first() {
    let fx = fixture(FakeMovies::default()).await;
    let alice = Actor::user("alice");

    let first = fx.store.create(&alice, GODFATHER, "Slow start", 3).await.unwrap();
    let second = fx.store.create(&Actor::user("bob"), GODFATHER, "Classic", 5).await.unwrap();
    fx.store.create(&alice, STAR_WARS, "Fun", 4).await.unwrap();

    let listed = fx.store.list_by_subject(GODFATHER).await.unwrap();

    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, second.id);
    assert_eq!(listed[1].id, first.id);
    assert!(second.created_at > first.created_at);
    assert_eq!(first.author_id, UserId::new("alice"));
    assert_eq!(first.rating.stars(), 3);
}

#[tokio::test]
async fn test_anonymous_cannot_create() {
    let fx = fixture(FakeMovies::default()).await;

    let err = fx.store.create(&Actor::Anonymous, GODFATHER, "Hi", 4).await.unwrap_err();

    assert!(matches!(err, ReviewError::Authz(DenyReason::NotAuthenticated)));
    assert!(fx.store.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_removes_from_subject_listing() {
    let fx = fixture(FakeMovies::default()).await;
    let alice = Actor::user("alice");
    let kept = fx.store.create(&alice, GODFATHER, "Keep", 4).await.unwrap();
    let doomed = fx.store.create(&alice, GODFATHER, "Remove", 2).await.unwrap();

    fx.store.delete(&alice, doomed.id).await.unwrap();

    let listed = fx.store.list_by_subject(GODFATHER).await.unwrap();
    assert!(listed.iter().all(|r| r.id != doomed.id));
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, kept.id);
}

#[tokio::test]
async fn test_update_replaces_text_only() {
    let fx = fixture(FakeMovies::default()).await;
    let alice = Actor::user("alice");
    let original = fx.store.create(&alice, GODFATHER, "Good", 4).await.unwrap();

    let updated = fx.store.update(&alice, original.id, "Actually great").await.unwrap();

    assert_eq!(updated.text, "Actually great");
    assert_eq!(updated.rating, original.rating);
    assert_eq!(updated.created_at, original.created_at);
    assert_eq!(updated.subject_id, original.subject_id);
    assert_eq!(updated.author_id, original.author_id);
}

#[tokio::test]
async fn test_non_owner_cannot_update_or_delete() {
    let fx = fixture(FakeMovies::default()).await;
    let review = fx.store.create(&Actor::user("alice"), GODFATHER, "Mine", 4).await.unwrap();
    let bob = Actor::user("bob");

    let err = fx.store.update(&bob, review.id, "Hijacked").await.unwrap_err();
    assert!(matches!(err, ReviewError::Authz(DenyReason::NotOwner)));

    let err = fx.store.delete(&bob, review.id).await.unwrap_err();
    assert!(matches!(err, ReviewError::Authz(DenyReason::NotOwner)));

    let stored = fx.relation.get(review.id).await.unwrap().unwrap();
    assert_eq!(stored.text, "Mine");
}

#[tokio::test]
async fn test_admin_can_delete_any_review() {
    let fx = fixture(FakeMovies::default()).await;
    let review = fx.store.create(&Actor::user("alice"), GODFATHER, "Spam", 1).await.unwrap();

    fx.store.delete(&Actor::user(ADMIN), review.id).await.unwrap();

    assert!(fx.store.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_review_is_not_found() {
    let fx = fixture(FakeMovies::default()).await;
    let missing = ReviewId::generate();

    let err = fx.store.update(&Actor::user("alice"), missing, "text").await.unwrap_err();
    assert!(matches!(err, ReviewError::NotFound(id) if id == missing));

    let err = fx.store.delete(&Actor::user(ADMIN), missing).await.unwrap_err();
    assert!(matches!(err, ReviewError::NotFound(_)));
}

#[tokio::test]
async fn test_profile_groups_by_movie_and_drops_unresolved() {
    let mut movies = FakeMovies::knowing(&[238, 11]);
    movies.failing.insert(680);
    let fx = fixture(movies).await;
    let alice = Actor::user("alice");

    fx.store.create(&alice, GODFATHER, "First", 5).await.unwrap();
    fx.store.create(&alice, MovieId(999), "Gone upstream", 3).await.unwrap();
    fx.store.create(&alice, STAR_WARS, "Space", 4).await.unwrap();
    fx.store.create(&alice, MovieId(680), "Lookup broken", 4).await.unwrap();
    fx.store.create(&alice, GODFATHER, "Rewatched", 5).await.unwrap();
    fx.store.create(&Actor::user("bob"), STAR_WARS, "Not alice", 2).await.unwrap();

    let groups = fx.store.list_by_author(&UserId::new("alice")).await.unwrap();

    let subjects: Vec<MovieId> = groups.iter().map(|g| g.movie.id).collect();
    assert_eq!(subjects, vec![GODFATHER, STAR_WARS]);
    let texts: Vec<&str> = groups[0].reviews.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["Rewatched", "First"]);
    assert_eq!(groups[1].reviews.len(), 1);
}

#[tokio::test]
async fn test_moderation_listing_requires_admin() {
    let fx = fixture(FakeMovies::default()).await;
    fx.store.create(&Actor::user("alice"), GODFATHER, "One", 3).await.unwrap();
    fx.store.create(&Actor::user("bob"), STAR_WARS, "Two", 4).await.unwrap();

    let all = fx.store.list_all_for_moderation(&Actor::user(ADMIN)).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].text, "Two");

    let err = fx.store.list_all_for_moderation(&Actor::user("alice")).await.unwrap_err();
    assert!(matches!(err, ReviewError::Authz(DenyReason::NotAdmin)));
}

#[tokio::test]
async fn test_timestamps_strictly_increase() {
    let fx = fixture(FakeMovies::default()).await;
    let alice = Actor::user("alice");

    let mut last = None;
    for i in 0..25 {
        let review = fx.store.create(&alice, GODFATHER, &format!("take {}", i), 3).await.unwrap();
        if let Some(previous) = last {
            assert!(review.created_at > previous);
        }
        last = Some(review.created_at);
    }
}
