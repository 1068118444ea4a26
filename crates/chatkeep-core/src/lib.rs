//! Business logic and repository trait definitions for chatkeep.
//!
//! This crate defines the "ports" (repository and LLM provider traits) that
//! the infrastructure layer implements, plus the chat logic built on them:
//! the message store adapter, session resolver, history reconstructor and
//! chat orchestrator. It depends only on `chatkeep-types` -- never on
//! `chatkeep-infra` or any database/IO crate.

pub mod chat;
pub mod llm;
