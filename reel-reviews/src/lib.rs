//! # Reel Reviews
//!
//! Star-rated reviews of catalog movies: the persisted review relation and its
//! change channel, the authorization gate in front of every mutation, the CRUD
//! facade and the live feed that follows the relation.

pub mod authz;
pub mod error;
pub mod feed;
pub mod identity;
pub mod relation;
pub mod roles;
pub mod store;

pub use authz::{Action, AuthzGate, Decision};
pub use error::{DenyReason, ReviewError, StoreError, SubscriptionError, ValidationError};
pub use feed::{FeedEntry, FeedSettings, FeedSubscription, LiveFeedSubscriber};
pub use identity::Actor;
pub use relation::{ReviewRelation, SqliteReviewRelation};
pub use roles::{RoleDirectory, SqliteRoleDirectory};
pub use store::{ReviewStore, SubjectReviews};
