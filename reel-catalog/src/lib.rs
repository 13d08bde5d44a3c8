//! # Reel Catalog
//!
//! Access to the upstream movie catalog: the TMDB client, the window merger
//! that adapts upstream pages to fixed-size browse windows, the genre browse
//! state machine and the landing page sub-flows.

pub mod browse;
pub mod error;
pub mod home;
pub mod merger;
pub mod models;
pub mod source;
pub mod tmdb;

pub use browse::{BrowseSession, BrowseState, FetchRequest, GenreBrowseController, LoadStatus};
pub use error::{CatalogError, PageFailure};
pub use home::{HomeLoader, HomeSnapshot};
pub use merger::{plan_window, total_windows, CatalogPageMerger, CatalogWindow, WindowPlan};
pub use models::{CatalogItem, CatalogQuery, GenreId, MovieDetails, UpstreamPage, WatchProvider};
pub use source::{CatalogSource, MovieLookup};
pub use tmdb::TmdbClient;
