//! Message DTOs - Messages as delivered to the client

use crate::entities::{Message, Role, SeenReceipt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest accepted message body, in characters
pub const MAX_CONTENT_CHARS: usize = 5000;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SenderDTO {
    pub user_id: String,
    pub role: Role,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeenByDTO {
    pub user_id: String,
    pub seen_at: DateTime<Utc>,
}

impl From<SeenReceipt> for SeenByDTO {
    fn from(value: SeenReceipt) -> Self {
        Self {
            user_id: value.user_id,
            seen_at: value.seen_at,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageDTO {
    #[serde(rename = "_id")]
    pub message_id: String,
    pub chat_id: String,
    pub sender: SenderDTO,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub seen_by: Vec<SeenByDTO>,
}

impl MessageDTO {
    pub fn new(message: Message, seen_by: Vec<SeenReceipt>) -> Self {
        Self {
            message_id: message.message_id,
            chat_id: message.chat_id,
            sender: SenderDTO {
                user_id: message.sender_id,
                role: message.sender_role,
                name: message.sender_name,
            },
            content: message.content,
            created_at: message.created_at,
            seen_by: seen_by.into_iter().map(SeenByDTO::from).collect(),
        }
    }
}

/// Data needed to persist a new message (id and timestamp are assigned by the repository)
#[derive(Debug, Clone)]
pub struct CreateMessageDTO {
    pub chat_id: String,
    pub sender_id: String,
    pub sender_role: Role,
    pub sender_name: String,
    pub content: String,
}

/// Trims a message body and checks it is within bounds.
pub fn normalize_content(raw: &str) -> Result<String, &'static str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("Message content cannot be empty");
    }
    if trimmed.chars().count() > MAX_CONTENT_CHARS {
        return Err("Message content must be at most 5000 characters");
    }
    Ok(trimmed.to_string())
}
