//! Core orchestration components
//!
//! The chat engine drives conversation turns end to end; the document
//! cache keeps crawled content warm between the scrape and chat endpoints.

mod cache;
mod chat;

pub use cache::{DocCache, DEFAULT_MAX_ENTRIES, DEFAULT_TTL};
pub use chat::{ChatEngine, ChatError};
