//! Webz.io news fetcher library.
//!
//! Pages through the Webz.io news search API and stores every post it has
//! not seen before, together with its thread, categories and entities, in a
//! SQLite database.

pub mod config;
pub mod constants;
pub mod db;
pub mod logging;
pub mod webz;
