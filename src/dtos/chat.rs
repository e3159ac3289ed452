//! Chat DTOs - Conversations as seen by the client

use crate::entities::{Chat, ContextType, Conversation, Participant, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDTO {
    pub user_id: String,
    pub role: Role,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_photo: Option<String>,
}

impl From<Participant> for ParticipantDTO {
    fn from(value: Participant) -> Self {
        Self {
            user_id: value.user_id,
            role: value.role,
            name: value.name,
            profile_photo: value.profile_photo,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LastMessageDTO {
    pub content: String,
    pub sender_id: String,
    pub timestamp: DateTime<Utc>,
}

impl LastMessageDTO {
    /// `None` until the first message of the chat has been persisted
    pub fn from_chat(chat: &Chat) -> Option<Self> {
        match (
            &chat.last_message_content,
            &chat.last_message_sender_id,
            chat.last_message_at,
        ) {
            (Some(content), Some(sender_id), Some(timestamp)) => Some(Self {
                content: content.clone(),
                sender_id: sender_id.clone(),
                timestamp,
            }),
            _ => None,
        }
    }
}

/// Provenance of a conversation: the product or order page it was opened from
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChatContextDTO {
    #[serde(rename = "type", default)]
    pub context_type: ContextType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 128))]
    pub reference_id: Option<String>,
}

/// Conversation returned by the directory endpoints
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChatDTO {
    #[serde(rename = "_id")]
    pub chat_id: String,
    pub participants: Vec<ParticipantDTO>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<LastMessageDTO>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ChatContextDTO>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    // only filled in by the conversation listing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unread_count: Option<i64>,
}

impl From<Conversation> for ChatDTO {
    fn from(value: Conversation) -> Self {
        let last_message = LastMessageDTO::from_chat(&value.chat);
        let chat = value.chat;
        let context = chat.context_type.map(|context_type| ChatContextDTO {
            context_type,
            reference_id: chat.context_reference_id.clone(),
        });
        Self {
            chat_id: chat.chat_id,
            participants: value.participants.into_iter().map(ParticipantDTO::from).collect(),
            last_message,
            context,
            created_at: chat.created_at,
            updated_at: chat.updated_at,
            unread_count: None,
        }
    }
}

/// Body of `POST /chats`
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatDTO {
    #[validate(length(min = 1, max = 128, message = "participantId must not be empty"))]
    pub participant_id: String,
    pub participant_role: Role,
    #[serde(default)]
    #[validate(nested)]
    pub context: Option<ChatContextDTO>,
}

/// Response of `PUT /chats/{chat_id}/seen`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarkSeenDTO {
    pub chat_id: String,
    pub marked_count: u64,
}

/// Data needed to persist a new conversation. The creator comes first.
#[derive(Debug, Clone)]
pub struct CreateConversationDTO {
    pub participants: [ParticipantDTO; 2],
    pub context: Option<ChatContextDTO>,
}

impl CreateConversationDTO {
    /// `(farmer, consumer)`, or `None` when both participants share a role
    pub fn farmer_and_consumer(&self) -> Option<(&ParticipantDTO, &ParticipantDTO)> {
        let [first, second] = &self.participants;
        match (first.role, second.role) {
            (Role::Farmer, Role::Consumer) => Some((first, second)),
            (Role::Consumer, Role::Farmer) => Some((second, first)),
            _ => None,
        }
    }
}
