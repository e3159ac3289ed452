//! Chat entity - Conversation between one farmer and one consumer

use super::enums::{ContextType, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row of the `chats` table
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Chat {
    pub chat_id: String,
    pub farmer_id: String,
    pub consumer_id: String,
    pub context_type: Option<ContextType>,
    pub context_reference_id: Option<String>,
    // denormalized copy of the newest message, refreshed on every send
    pub last_message_content: Option<String>,
    pub last_message_sender_id: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Snapshot of a participant taken when the conversation was created.
/// Name and photo are not refreshed afterwards.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Participant {
    pub chat_id: String,
    pub user_id: String,
    pub role: Role,
    pub name: String,
    pub profile_photo: Option<String>,
    pub position: i64,
}

/// A chat together with its two participants, ordered by `position`.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub chat: Chat,
    pub participants: Vec<Participant>,
}

impl Conversation {
    pub fn chat_id(&self) -> &str {
        &self.chat.chat_id
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participant(user_id).is_some()
    }

    pub fn participant(&self, user_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    /// Every participant except `user_id`
    pub fn others<'a>(&'a self, user_id: &'a str) -> impl Iterator<Item = &'a Participant> + 'a {
        self.participants.iter().filter(move |p| p.user_id != user_id)
    }
}
