//! HTTP request handlers for the chat API.

pub mod chat;
pub mod session;
