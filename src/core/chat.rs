//! Chat turn orchestration
//!
//! The ChatEngine drives one conversation turn end to end:
//! 1. Appends the user message (and titles brand-new conversations)
//! 2. Picks a branch: a documentation URL in the message with no document
//!    loaded yet triggers crawl + summarize + insights message; everything
//!    else goes to a persona-framed completion over the full history
//! 3. Persists each step through the conversation store
//!
//! Turns are serialized through an async mutex over the store so
//! concurrent submissions cannot interleave their writes.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::{Mutex, MutexGuard};
use tracing::warn;

use crate::config::prompts;
use crate::conversation::{Conversation, ConversationUpdate, Insights, Message, Persona};
use crate::crawler::Crawler;
use crate::providers::{ChatMessage, ProviderChain, ProviderError};
use crate::store::{ConversationStore, StoreError};
use crate::summarizer;
use crate::text::truncate_chars;

/// Crawls yielding less text than this are treated as failures.
const MIN_CRAWL_CHARS: usize = 100;

/// Title budget for freshly named conversations.
const TITLE_CHARS: usize = 40;

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").expect("valid regex"));

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// The conversation turn orchestrator.
pub struct ChatEngine {
    store: Mutex<ConversationStore>,
    chain: Arc<ProviderChain>,
    crawler: Arc<Crawler>,
}

impl ChatEngine {
    pub fn new(store: ConversationStore, chain: Arc<ProviderChain>, crawler: Arc<Crawler>) -> Self {
        Self {
            store: Mutex::new(store),
            chain,
            crawler,
        }
    }

    /// Direct access to the conversation store, serialized with turns.
    pub async fn store(&self) -> MutexGuard<'_, ConversationStore> {
        self.store.lock().await
    }

    /// Run one conversation turn and return the updated conversation.
    ///
    /// The first message of a conversation also becomes its title. When
    /// the message carries a URL and no document is loaded yet, the turn
    /// crawls and summarizes it instead of asking for a completion; a
    /// failed crawl leaves the conversation with just the user message.
    pub async fn submit(
        &self,
        conversation_id: &str,
        user_text: &str,
    ) -> Result<Conversation, ChatError> {
        let mut store = self.store.lock().await;
        let persona = store.persona();

        let existing = store
            .get(conversation_id)
            .ok_or_else(|| StoreError::NotFound(conversation_id.to_string()))?;
        let is_first_message = existing.messages.is_empty();

        let user_text = user_text.trim();
        let mut conversation = store
            .push_message(conversation_id, Message::user(user_text))
            .await?;

        if is_first_message {
            conversation = store.rename(conversation_id, title_from(user_text)).await?;
        }

        let url = find_url(user_text).filter(|_| conversation.doc_content.is_none());
        if let Some(url) = url {
            if let Some((content, insights)) = self.load_documentation(&url, persona).await {
                store
                    .update(
                        conversation_id,
                        ConversationUpdate {
                            doc_url: Some(url.clone()),
                            doc_content: Some(content),
                            ..Default::default()
                        },
                    )
                    .await?;
                let reply = insights_message(&url, &insights);
                conversation = store
                    .push_message(conversation_id, Message::assistant(reply))
                    .await?;
            }
            return Ok(conversation);
        }

        let reply = self.chat_reply(&conversation, persona).await?;
        conversation = store
            .push_message(conversation_id, Message::assistant(reply))
            .await?;
        Ok(conversation)
    }

    /// Edit a message, dropping the stale tail; if the edit leaves a user
    /// message at the end, regenerate the assistant reply.
    pub async fn edit_message(
        &self,
        conversation_id: &str,
        message_id: &str,
        new_content: &str,
    ) -> Result<Conversation, ChatError> {
        let mut store = self.store.lock().await;
        let persona = store.persona();

        let outcome = store
            .edit_message(conversation_id, message_id, new_content)
            .await?;
        if !outcome.needs_regeneration {
            return Ok(outcome.conversation);
        }

        let reply = self.chat_reply(&outcome.conversation, persona).await?;
        Ok(store
            .push_message(conversation_id, Message::assistant(reply))
            .await?)
    }

    /// Crawl and summarize a documentation site.
    ///
    /// Returns `None` on any failure; the turn then continues without a
    /// document rather than surfacing an error to the user.
    async fn load_documentation(
        &self,
        url: &str,
        persona: Persona,
    ) -> Option<(String, Insights)> {
        let content = match self.crawler.crawl(url).await {
            Ok(content) => content,
            Err(err) => {
                warn!(url = %url, error = %err, "documentation crawl failed");
                return None;
            }
        };

        if content.chars().count() < MIN_CRAWL_CHARS {
            warn!(url = %url, "crawl produced too little content");
            return None;
        }

        let insights = summarizer::summarize_document(&self.chain, &content, persona).await;
        Some((content, insights))
    }

    async fn chat_reply(
        &self,
        conversation: &Conversation,
        persona: Persona,
    ) -> Result<String, ProviderError> {
        let system = prompts::chat_system_prompt(persona, conversation.doc_content.as_deref());

        let mut messages = Vec::with_capacity(conversation.messages.len() + 1);
        messages.push(ChatMessage::system(system));
        messages.extend(conversation.messages.iter().map(ChatMessage::from));

        self.chain
            .complete(&messages, prompts::chat_params(persona))
            .await
    }
}

fn find_url(text: &str) -> Option<String> {
    URL_PATTERN.find(text).map(|m| m.as_str().to_string())
}

fn title_from(text: &str) -> String {
    let prefix = truncate_chars(text, TITLE_CHARS);
    if prefix.len() < text.len() {
        format!("{prefix}...")
    } else {
        prefix.to_string()
    }
}

fn insights_message(url: &str, insights: &Insights) -> String {
    let key_points = insights
        .key_points
        .iter()
        .enumerate()
        .map(|(i, point)| format!("{}. {}", i + 1, point))
        .collect::<Vec<_>>()
        .join("\n");
    let questions = insights
        .suggested_questions
        .iter()
        .map(|q| format!("• {q}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "I've analyzed the documentation from **{url}**\n\n\
         **Summary:**\n{summary}\n\n\
         **Key Points:**\n{key_points}\n\n\
         **Suggested Questions:**\n{questions}\n\n\
         Feel free to ask me anything about this documentation!",
        summary = insights.summary,
    )
}
