//! Persisted record shapes
//!
//! `Review` is owned by its author. `subject_id`, `author_id`, `rating` and
//! `created_at` never change after creation; only `text` is mutable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{MovieId, ReviewId, UserId};

/// Lowest accepted star rating
pub const MIN_RATING: u8 = 1;
/// Highest accepted star rating
pub const MAX_RATING: u8 = 5;

/// Star rating in `[MIN_RATING, MAX_RATING]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Returns `None` when `stars` is outside `[1, 5]`
    pub fn new(stars: u8) -> Option<Self> {
        (MIN_RATING..=MAX_RATING).contains(&stars).then_some(Self(stars))
    }

    pub fn stars(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = String;

    fn try_from(stars: u8) -> Result<Self, Self::Error> {
        Rating::new(stars).ok_or_else(|| {
            format!("rating {} outside [{}, {}]", stars, MIN_RATING, MAX_RATING)
        })
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> u8 {
        rating.0
    }
}

/// A star-rated comment on one catalog movie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    /// Catalog movie the review is about
    pub subject_id: MovieId,
    pub author_id: UserId,
    pub text: String,
    pub rating: Rating,
    /// Assigned by the store; strictly increasing across inserts
    pub created_at: DateTime<Utc>,
}

/// Validated input for inserting a review; the store assigns id and timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub subject_id: MovieId,
    pub author_id: UserId,
    pub text: String,
    pub rating: Rating,
}

/// Administrative privilege for one user, provisioned outside Reel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub user_id: UserId,
    pub is_admin: bool,
}
