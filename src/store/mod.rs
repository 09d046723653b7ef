//! Conversation store
//!
//! Owns the in-memory conversation collection for the current persona
//! and persists it as one JSON payload per persona through the
//! [`StateStore`]. Collections are ordered most recent first. All
//! mutation goes through this type so the persisted payload can never
//! drift from memory.

pub mod state;

use chrono::Utc;
use thiserror::Error;
use tracing::warn;

use crate::conversation::{Conversation, ConversationUpdate, Message, Persona, Role, Settings};

pub use state::StateStore;

const SETTINGS_KEY: &str = "docscout-settings";

fn conversations_key(persona: Persona) -> String {
    format!("docscout-{}-conversations", persona.as_str())
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Conversation not found: {0}")]
    NotFound(String),

    #[error("Message not found: {0}")]
    MessageNotFound(String),

    #[error("Storage failed: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result of editing a message in place.
#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub conversation: Conversation,
    /// True when the edit left a user message as the conversation tail,
    /// meaning the caller should regenerate the assistant reply.
    pub needs_regeneration: bool,
}

/// Per-persona conversation collection with write-through persistence.
pub struct ConversationStore {
    persona: Persona,
    conversations: Vec<Conversation>,
    active_id: Option<String>,
    state: StateStore,
}

impl ConversationStore {
    /// Load the collection persisted for `persona`, or start empty.
    pub async fn open(state: StateStore, persona: Persona) -> Result<Self, StoreError> {
        let conversations = load_collection(&state, persona).await?;
        let active_id = conversations.first().map(|c| c.id.clone());

        Ok(Self {
            persona,
            conversations,
            active_id,
            state,
        })
    }

    pub fn persona(&self) -> Persona {
        self.persona
    }

    /// Conversations, most recent first.
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    /// Create a fresh conversation, make it active, and put it first.
    pub async fn create(&mut self) -> Result<Conversation, StoreError> {
        let conversation = Conversation::new();
        self.conversations.insert(0, conversation.clone());
        self.active_id = Some(conversation.id.clone());
        self.persist().await?;
        Ok(conversation)
    }

    pub fn select(&mut self, id: &str) -> Result<(), StoreError> {
        if self.get(id).is_none() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.active_id = Some(id.to_string());
        Ok(())
    }

    /// Delete a conversation. If it was active, the most recent
    /// remaining conversation becomes active.
    pub async fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        let before = self.conversations.len();
        self.conversations.retain(|c| c.id != id);
        if self.conversations.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }

        if self.active_id.as_deref() == Some(id) {
            self.active_id = self.conversations.first().map(|c| c.id.clone());
        }

        self.persist().await?;
        Ok(())
    }

    pub async fn rename(
        &mut self,
        id: &str,
        title: impl Into<String>,
    ) -> Result<Conversation, StoreError> {
        self.update(
            id,
            ConversationUpdate {
                title: Some(title.into()),
                ..Default::default()
            },
        )
        .await
    }

    /// Apply a partial update. `created_at` is never touched;
    /// `updated_at` is bumped on every call.
    pub async fn update(
        &mut self,
        id: &str,
        update: ConversationUpdate,
    ) -> Result<Conversation, StoreError> {
        let conversation = self
            .conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if let Some(title) = update.title {
            conversation.title = title;
        }
        if let Some(messages) = update.messages {
            conversation.messages = messages;
        }
        if let Some(doc_url) = update.doc_url {
            conversation.doc_url = Some(doc_url);
        }
        if let Some(doc_content) = update.doc_content {
            conversation.doc_content = Some(doc_content);
        }
        conversation.updated_at = Utc::now();
        let snapshot = conversation.clone();

        self.persist().await?;
        Ok(snapshot)
    }

    /// Append one message to a conversation's log.
    pub async fn push_message(
        &mut self,
        id: &str,
        message: Message,
    ) -> Result<Conversation, StoreError> {
        let conversation = self
            .conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        conversation.messages.push(message);
        conversation.updated_at = Utc::now();
        let snapshot = conversation.clone();

        self.persist().await?;
        Ok(snapshot)
    }

    /// Replace a message's content and drop everything after it.
    ///
    /// Editing message k of an n-message log leaves exactly k+1 messages;
    /// the stale replies after the edit point are discarded.
    pub async fn edit_message(
        &mut self,
        conversation_id: &str,
        message_id: &str,
        new_content: impl Into<String>,
    ) -> Result<EditOutcome, StoreError> {
        let conversation = self
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
            .ok_or_else(|| StoreError::NotFound(conversation_id.to_string()))?;

        let index = conversation
            .messages
            .iter()
            .position(|m| m.id == message_id)
            .ok_or_else(|| StoreError::MessageNotFound(message_id.to_string()))?;

        conversation.messages.truncate(index + 1);
        let message = &mut conversation.messages[index];
        message.content = new_content.into();
        let needs_regeneration = message.role == Role::User;

        conversation.updated_at = Utc::now();
        let snapshot = conversation.clone();

        self.persist().await?;
        Ok(EditOutcome {
            conversation: snapshot,
            needs_regeneration,
        })
    }

    /// Switch to another persona's collection, reloading it from storage
    /// (or starting empty when nothing was persisted yet).
    pub async fn switch_mode(&mut self, persona: Persona) -> Result<(), StoreError> {
        if persona == self.persona {
            return Ok(());
        }

        self.persona = persona;
        self.conversations = load_collection(&self.state, persona).await?;
        self.active_id = self.conversations.first().map(|c| c.id.clone());
        Ok(())
    }

    pub async fn load_settings(&self) -> Result<Settings, StoreError> {
        match self.state.load(SETTINGS_KEY).await? {
            Some(payload) => Ok(serde_json::from_str(&payload).unwrap_or_else(|err| {
                warn!(error = %err, "corrupt settings payload, using defaults");
                Settings::default()
            })),
            None => Ok(Settings::default()),
        }
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        let payload = serde_json::to_string(settings)?;
        self.state.save(SETTINGS_KEY, &payload).await?;
        Ok(())
    }

    /// Write the whole collection under the persona's key.
    ///
    /// An empty collection is never written: deleting the last
    /// conversation leaves the previous payload in storage, so it comes
    /// back on the next load.
    async fn persist(&self) -> Result<(), StoreError> {
        if self.conversations.is_empty() {
            return Ok(());
        }

        let payload = serde_json::to_string(&self.conversations)?;
        self.state
            .save(&conversations_key(self.persona), &payload)
            .await?;
        Ok(())
    }
}

async fn load_collection(
    state: &StateStore,
    persona: Persona,
) -> Result<Vec<Conversation>, StoreError> {
    let Some(payload) = state.load(&conversations_key(persona)).await? else {
        return Ok(Vec::new());
    };

    match serde_json::from_str(&payload) {
        Ok(conversations) => Ok(conversations),
        Err(err) => {
            warn!(
                persona = persona.as_str(),
                error = %err,
                "corrupt conversation payload, starting empty"
            );
            Ok(Vec::new())
        }
    }
}
