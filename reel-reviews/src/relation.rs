//! Persisted review relation with a change subscription
//!
//! [`ReviewRelation`] is the raw record store: no validation and no
//! authorization happen here. Every committed write emits one [`ReelEvent`]
//! which subscribers obtain from [`ReviewRelation::watch`].

use async_trait::async_trait;
use reel_common::events::{EventBus, ReelEvent};
use reel_common::time::{from_micros, now, to_micros};
use reel_common::{MovieId, NewReview, Rating, Review, ReviewId, UserId};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::StoreError;

/// Record-level operations on the review relation
///
/// Every listing is ordered by `created_at`, newest first.
#[async_trait]
pub trait ReviewRelation: Send + Sync {
    async fn get(&self, id: ReviewId) -> Result<Option<Review>, StoreError>;

    /// Persist a review; the store assigns `id` and a strictly increasing `created_at`
    async fn insert(&self, review: NewReview) -> Result<Review, StoreError>;

    /// Replace the text only; `None` when the review does not exist
    async fn update_text(&self, id: ReviewId, text: &str) -> Result<Option<Review>, StoreError>;

    /// `false` when the review did not exist
    async fn delete(&self, id: ReviewId) -> Result<bool, StoreError>;

    async fn list_by_subject(&self, subject: MovieId) -> Result<Vec<Review>, StoreError>;

    async fn list_by_author(&self, author: &UserId) -> Result<Vec<Review>, StoreError>;

    async fn list_all(&self) -> Result<Vec<Review>, StoreError>;

    /// Change notifications for writes committed after this call
    fn watch(&self) -> broadcast::Receiver<ReelEvent>;
}

/// Review relation stored in the `reviews` table
#[derive(Clone)]
pub struct SqliteReviewRelation {
    pool: SqlitePool,
    events: EventBus,
}

const REVIEW_COLUMNS: &str = "id, subject_id, author_id, text, rating, created_at";

impl SqliteReviewRelation {
    pub fn new(pool: SqlitePool, events: EventBus) -> Self {
        Self { pool, events }
    }

    async fn list_where(
        &self,
        filter: &str,
        bind: Option<ListBind<'_>>,
    ) -> Result<Vec<Review>, StoreError> {
        let sql = format!(
            "SELECT {} FROM reviews {} ORDER BY created_at DESC",
            REVIEW_COLUMNS, filter
        );
        let mut query = sqlx::query(&sql);
        query = match bind {
            Some(ListBind::Subject(subject)) => query.bind(subject.0 as i64),
            Some(ListBind::Author(author)) => query.bind(author.as_str()),
            None => query,
        };

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(review_from_row).collect()
    }
}

enum ListBind<'a> {
    Subject(MovieId),
    Author(&'a UserId),
}

#[async_trait]
impl ReviewRelation for SqliteReviewRelation {
    async fn get(&self, id: ReviewId) -> Result<Option<Review>, StoreError> {
        let sql = format!("SELECT {} FROM reviews WHERE id = ?", REVIEW_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(review_from_row).transpose()
    }

    async fn insert(&self, review: NewReview) -> Result<Review, StoreError> {
        let id = ReviewId::generate();

        // Single statement: the timestamp is at least one microsecond past the
        // newest stored review even if the wall clock stepped back
        let created_at: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO reviews (id, subject_id, author_id, text, rating, created_at)
            VALUES (?, ?, ?, ?, ?, MAX(?, COALESCE((SELECT MAX(created_at) FROM reviews), 0) + 1))
            RETURNING created_at
            "#,
        )
        .bind(id.to_string())
        .bind(review.subject_id.0 as i64)
        .bind(review.author_id.as_str())
        .bind(&review.text)
        .bind(i64::from(review.rating.stars()))
        .bind(to_micros(now()))
        .fetch_one(&self.pool)
        .await?;

        let stored = Review {
            id,
            subject_id: review.subject_id,
            author_id: review.author_id,
            text: review.text,
            rating: review.rating,
            created_at: from_micros(created_at),
        };

        debug!(review_id = %id, subject_id = %stored.subject_id, "Review inserted");
        self.events.emit_lossy(ReelEvent::ReviewCreated {
            review_id: id,
            subject_id: stored.subject_id,
            author_id: stored.author_id.clone(),
            timestamp: now(),
        });

        Ok(stored)
    }

    async fn update_text(&self, id: ReviewId, text: &str) -> Result<Option<Review>, StoreError> {
        let sql = format!("UPDATE reviews SET text = ? WHERE id = ? RETURNING {}", REVIEW_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(text)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let review = review_from_row(&row)?;

        debug!(review_id = %id, "Review text replaced");
        self.events.emit_lossy(ReelEvent::ReviewUpdated {
            review_id: id,
            subject_id: review.subject_id,
            timestamp: now(),
        });

        Ok(Some(review))
    }

    async fn delete(&self, id: ReviewId) -> Result<bool, StoreError> {
        let subject: Option<i64> =
            sqlx::query_scalar("DELETE FROM reviews WHERE id = ? RETURNING subject_id")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        let Some(subject) = subject else {
            return Ok(false);
        };

        debug!(review_id = %id, "Review deleted");
        self.events.emit_lossy(ReelEvent::ReviewDeleted {
            review_id: id,
            subject_id: MovieId(subject as u64),
            timestamp: now(),
        });

        Ok(true)
    }

    async fn list_by_subject(&self, subject: MovieId) -> Result<Vec<Review>, StoreError> {
        self.list_where("WHERE subject_id = ?", Some(ListBind::Subject(subject))).await
    }

    async fn list_by_author(&self, author: &UserId) -> Result<Vec<Review>, StoreError> {
        self.list_where("WHERE author_id = ?", Some(ListBind::Author(author))).await
    }

    async fn list_all(&self) -> Result<Vec<Review>, StoreError> {
        self.list_where("", None).await
    }

    fn watch(&self) -> broadcast::Receiver<ReelEvent> {
        self.events.subscribe()
    }
}

fn review_from_row(row: &SqliteRow) -> Result<Review, StoreError> {
    let id: String = row.get("id");
    let id = id
        .parse::<ReviewId>()
        .map_err(|e| StoreError::Corrupt(format!("review id {:?}: {}", id, e)))?;

    let stars: i64 = row.get("rating");
    let rating = u8::try_from(stars)
        .ok()
        .and_then(Rating::new)
        .ok_or_else(|| StoreError::Corrupt(format!("review {} has rating {}", id, stars)))?;

    let subject_id: i64 = row.get("subject_id");
    let author_id: String = row.get("author_id");
    let created_at: i64 = row.get("created_at");

    Ok(Review {
        id,
        subject_id: MovieId(subject_id as u64),
        author_id: UserId(author_id),
        text: row.get("text"),
        rating,
        created_at: from_micros(created_at),
    })
}
