//! Custom axum extractors.

pub mod client;
