//! DocScout - documentation chat assistant
//!
//! Point it at a documentation site: the crawler walks same-origin pages
//! breadth-first, the summarizer distills them through a chain of
//! OpenAI-compatible completion providers, and the chat engine answers
//! follow-up questions grounded in the crawled text.
//!
//! The crate is a library plus a server binary. The binary serves the
//! stateless JSON API (chat requests carry their own history); embedders
//! wanting persistent, server-side conversations drive
//! [`core::ChatEngine`] over a [`store::ConversationStore`] directly.

pub mod config;
pub mod conversation;
pub mod core;
pub mod crawler;
pub mod extract;
pub mod providers;
pub mod routes;
pub mod store;
pub mod summarizer;
pub mod text;
