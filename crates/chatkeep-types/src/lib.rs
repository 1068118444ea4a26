//! Shared domain types for chatkeep.
//!
//! This crate contains the types used across the workspace: session ids,
//! collection names, stored message records, conversations, LLM request and
//! response shapes, configuration, and the error enums.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
