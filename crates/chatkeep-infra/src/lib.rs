//! Infrastructure layer for chatkeep.
//!
//! Contains implementations of the ports defined in `chatkeep-core`: SQLite
//! message storage, the OpenAI-compatible model endpoint client, and the
//! configuration file loader.

pub mod config;
pub mod llm;
pub mod sqlite;
