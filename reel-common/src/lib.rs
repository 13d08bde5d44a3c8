//! # Reel Common Library
//!
//! Shared code for the Reel crates including:
//! - Identifiers and persisted models (reviews, role assignments)
//! - Event types (ReelEvent enum) and the EventBus
//! - Configuration loading
//! - Database initialization
//! - Utility functions

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod events;
pub mod ids;
pub mod models;
pub mod time;

pub use error::{Error, Result};
pub use ids::{MovieId, ReviewId, UserId};
pub use models::{NewReview, Rating, Review, RoleAssignment};
