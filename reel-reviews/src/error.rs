//! Error types for review operations

use reel_common::ReviewId;
use serde::Serialize;
use thiserror::Error;

/// Input rejected before any store or role lookup
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Rating {0} is outside 1..=5")]
    RatingOutOfRange(i64),

    #[error("Review text must not be empty")]
    EmptyText,
}

/// Why the gate refused an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    #[error("Sign-in required")]
    NotAuthenticated,

    #[error("Only the author or an administrator may change this review")]
    NotOwner,

    #[error("Administrator role required")]
    NotAdmin,

    /// The role relation could not be read; treated as a refusal
    #[error("Role lookup failed")]
    RoleLookupFailed,
}

/// Persistence failures from the review or role relation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by [`crate::ReviewStore`]
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Not authorized: {0}")]
    Authz(DenyReason),

    #[error("Review not found: {0}")]
    NotFound(ReviewId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Change subscription problems, handled inside the live feed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    #[error("Subscriber fell behind by {0} events")]
    Lagged(u64),

    #[error("Change channel closed")]
    Closed,
}
