//! HTTP layer for chatkeep.
//!
//! Axum server exposing the chat API at `/api/v1/` with the envelope
//! response format, plus the single-page browser UI at `/`.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
