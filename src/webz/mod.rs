//! Client for the Webz.io news search API.
//!
//! [`WebzQueryBuilder`] composes request URLs, [`WebzService`] walks the
//! result pages and hands each one to a [`crate::db::PostRepository`].

mod fetcher;
mod models;
mod query;

pub use fetcher::*;
pub use models::*;
pub use query::*;
