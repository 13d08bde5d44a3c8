//! Review CRUD facade
//!
//! Every mutation runs in the same order: validate input, consult the gate,
//! then touch the relation. Invalid input never reaches the role relation or
//! the review relation.
//!
//! List views do not re-read after writing. The live feed observes writes
//! through the relation's change subscription; [`ReviewStore::list_all`] is
//! the manual fallback.

use futures::future::join_all;
use reel_catalog::{MovieDetails, MovieLookup};
use reel_common::{MovieId, NewReview, Rating, Review, ReviewId, UserId};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::authz::{Action, AuthzGate, Decision};
use crate::error::{DenyReason, ReviewError, ValidationError};
use crate::identity::Actor;
use crate::relation::ReviewRelation;

/// One movie's reviews on a profile page
#[derive(Debug, Clone, Serialize)]
pub struct SubjectReviews {
    pub movie: MovieDetails,
    /// Newest first
    pub reviews: Vec<Review>,
}

#[derive(Clone)]
pub struct ReviewStore {
    relation: Arc<dyn ReviewRelation>,
    gate: AuthzGate,
    movies: Arc<dyn MovieLookup>,
}

impl ReviewStore {
    pub fn new(
        relation: Arc<dyn ReviewRelation>,
        gate: AuthzGate,
        movies: Arc<dyn MovieLookup>,
    ) -> Self {
        Self { relation, gate, movies }
    }

    /// Post a review as `actor`
    pub async fn create(
        &self,
        actor: &Actor,
        subject_id: MovieId,
        text: &str,
        rating: i64,
    ) -> Result<Review, ReviewError> {
        let rating = validate_rating(rating)?;
        let text = validate_text(text)?;

        let author_id = self.check(Action::Create, actor, None).await?;

        let review = self
            .relation
            .insert(NewReview { subject_id, author_id, text, rating })
            .await?;

        info!(
            review_id = %review.id,
            subject_id = %subject_id,
            author_id = %review.author_id,
            rating = review.rating.stars(),
            "Review created"
        );
        Ok(review)
    }

    /// Reviews of one movie, newest first
    pub async fn list_by_subject(&self, subject_id: MovieId) -> Result<Vec<Review>, ReviewError> {
        Ok(self.relation.list_by_subject(subject_id).await?)
    }

    /// A user's reviews grouped by movie
    ///
    /// Groups are ordered by their newest review. Movies the catalog no longer
    /// resolves are dropped with their reviews.
    pub async fn list_by_author(&self, author: &UserId) -> Result<Vec<SubjectReviews>, ReviewError> {
        let reviews = self.relation.list_by_author(author).await?;

        let mut groups: Vec<(MovieId, Vec<Review>)> = Vec::new();
        for review in reviews {
            match groups.iter_mut().find(|(subject, _)| *subject == review.subject_id) {
                Some((_, group)) => group.push(review),
                None => groups.push((review.subject_id, vec![review])),
            }
        }

        let lookups = groups.iter().map(|(subject, _)| self.movies.movie_details(*subject));
        let resolved = join_all(lookups).await;

        let mut result = Vec::with_capacity(groups.len());
        for ((subject, reviews), movie) in groups.into_iter().zip(resolved) {
            match movie {
                Ok(Some(movie)) => result.push(SubjectReviews { movie, reviews }),
                Ok(None) => {
                    debug!(subject_id = %subject, "Dropping reviews of unresolvable movie");
                }
                Err(e) => {
                    warn!(subject_id = %subject, error = %e, "Movie lookup failed, dropping group");
                }
            }
        }
        Ok(result)
    }

    /// Replace a review's text; rating and timestamp stay as created
    pub async fn update(
        &self,
        actor: &Actor,
        review_id: ReviewId,
        new_text: &str,
    ) -> Result<Review, ReviewError> {
        let text = validate_text(new_text)?;

        let existing = self.load(review_id).await?;
        self.check(Action::Update, actor, Some(&existing.author_id)).await?;

        let updated = self
            .relation
            .update_text(review_id, &text)
            .await?
            .ok_or(ReviewError::NotFound(review_id))?;

        info!(review_id = %review_id, actor = ?actor, "Review updated");
        Ok(updated)
    }

    pub async fn delete(&self, actor: &Actor, review_id: ReviewId) -> Result<(), ReviewError> {
        let existing = self.load(review_id).await?;
        self.check(Action::Delete, actor, Some(&existing.author_id)).await?;

        if !self.relation.delete(review_id).await? {
            return Err(ReviewError::NotFound(review_id));
        }

        info!(review_id = %review_id, actor = ?actor, "Review deleted");
        Ok(())
    }

    /// Every review, newest first
    pub async fn list_all(&self) -> Result<Vec<Review>, ReviewError> {
        Ok(self.relation.list_all().await?)
    }

    /// Every review for the moderation view; administrators only
    pub async fn list_all_for_moderation(&self, actor: &Actor) -> Result<Vec<Review>, ReviewError> {
        if let Decision::Deny(reason) = self.gate.require_admin(actor).await {
            return Err(ReviewError::Authz(reason));
        }
        self.list_all().await
    }

    async fn load(&self, review_id: ReviewId) -> Result<Review, ReviewError> {
        self.relation
            .get(review_id)
            .await?
            .ok_or(ReviewError::NotFound(review_id))
    }

    /// Returns the acting user on Allow
    async fn check(
        &self,
        action: Action,
        actor: &Actor,
        owner: Option<&UserId>,
    ) -> Result<UserId, ReviewError> {
        match self.gate.authorize(action, actor, owner).await {
            Decision::Allow => actor
                .uid()
                .cloned()
                .ok_or(ReviewError::Authz(DenyReason::NotAuthenticated)),
            Decision::Deny(reason) => Err(ReviewError::Authz(reason)),
        }
    }
}

fn validate_rating(rating: i64) -> Result<Rating, ValidationError> {
    u8::try_from(rating)
        .ok()
        .and_then(Rating::new)
        .ok_or(ValidationError::RatingOutOfRange(rating))
}

fn validate_text(text: &str) -> Result<String, ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyText);
    }
    Ok(text.to_string())
}
