//! Conversation data model: personas, messages, conversations, insights

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Conversation framing. Changes system prompts and response style,
/// not the pipeline itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Persona {
    #[default]
    #[serde(rename = "dev")]
    Developer,
    #[serde(rename = "user")]
    Learner,
}

impl Persona {
    /// Wire/storage value (`dev` or `user`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::Developer => "dev",
            Persona::Learner => "user",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single turn in a conversation. System prompts are synthesized per
/// request and never stored as messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// An ordered message log plus the document it is anchored to, if any.
/// Owned and mutated exclusively by the conversation store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7().to_string(),
            title: "New Conversation".to_string(),
            messages: Vec::new(),
            doc_url: None,
            doc_content: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// Partial update applied through [`crate::store::ConversationStore::update`].
/// Callers supply the full new value for any field they change; message
/// lists are substituted whole, never patched element-wise.
#[derive(Debug, Clone, Default)]
pub struct ConversationUpdate {
    pub title: Option<String>,
    pub messages: Option<Vec<Message>>,
    pub doc_url: Option<String>,
    pub doc_content: Option<String>,
}

/// Structured result of analyzing a crawled or extracted document.
/// Produced once per document and presented as the first assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub suggested_questions: Vec<String>,
}

/// Client display settings. Stored under a single key, shared by both
/// personas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub theme: Theme,
    pub tts_voice: String,
    pub density: Density,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Density {
    Compact,
    Comfortable,
    Spacious,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            tts_voice: "alloy".to_string(),
            density: Density::Comfortable,
        }
    }
}
