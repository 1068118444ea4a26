//! Chat persistence and orchestration for chatkeep.
//!
//! - `repository`: the document-store port implemented by chatkeep-infra
//! - `store`: message store adapter (reserved collections, append, lookup)
//! - `resolver`: session -> collection resolution and suffix allocation
//! - `history`: ordered history reconstruction and sidebar previews
//! - `session`: per-interaction session context
//! - `service`: chat orchestrator tying storage to the model endpoint

pub mod history;
pub mod repository;
pub mod resolver;
pub mod service;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
