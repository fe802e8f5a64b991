//! This crate provides access to wellbore data held in a set of subsurface REST APIs: drilled
//! wellbore metadata and trajectories, planned wells, daily production and injection volumes,
//! completions, perforations and field model polygons.
//!
//! Each backend is reached through a [session](session::Session) authorised by an OAuth2
//! device code flow, with tokens cached on disk between runs. Responses are absorbed into
//! [tables](table::Table) so that an unavailable backend yields empty results rather than
//! aborting a query.
//!
//! The crate is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [reqwest] performs the HTTP requests.
//! * [Serde](serde) performs (de)serialisation of JSON response data.
//! * [ndarray] holds trajectory coordinates.
//! * [cached] provides the in-memory cache of provider results.
//! * [csv] writes the files produced by the batch extractors.

pub mod app;
pub mod auth;
pub mod batch;
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod models;
pub mod provider;
pub mod provider_cache;
pub mod session;
pub mod table;
#[cfg(test)]
pub mod test_utils;
pub mod token_cache;
pub mod tracing;
