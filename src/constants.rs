//! Shared constants used across the application.

/// User agent string sent with every Webz.io API request.
pub const USER_AGENT: &str = concat!("webz-fetcher/", env!("CARGO_PKG_VERSION"));

/// Path of the news search endpoint, relative to the API origin.
pub const NEWS_API_PATH: &str = "/newsApiLite";

/// Page size requested on the first page of a fetch.
pub const INITIAL_PAGE_SIZE: i64 = 10;
