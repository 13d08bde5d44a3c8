//! HTTP API handlers for reel-web

pub mod browse;
pub mod catalog;
pub mod error;
pub mod feed;
pub mod health;
pub mod identity;
pub mod reviews;

pub use browse::BrowseSessions;
pub use error::{ApiError, ApiResult};
pub use feed::feed_stream;
pub use health::health_routes;
pub use identity::{Caller, UID_HEADER};
