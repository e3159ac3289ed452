//! WebSocket Event DTOs - Frames exchanged on the realtime channel
//!
//! Every frame is a JSON object tagged by event name:
//! `{ "event": "send_message", "data": { "chatId": "...", "content": "..." } }`
//! Events that only target a chat carry the bare chat id as `data`.

use crate::dtos::{LastMessageDTO, MessageDTO};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageDTO {
    pub chat_id: String,
    pub content: String,
}

/// Client -> server
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinChat(String),
    LeaveChat(String),
    SendMessage(SendMessageDTO),
    MarkSeen(String),
    TypingStart(String),
    TypingStop(String),
}

/// Lightweight notification sent to a participant's personal room
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatUpdatedDTO {
    pub chat_id: String,
    pub last_message: LastMessageDTO,
    pub updated_at: DateTime<Utc>,
}

/// Who did something in which chat (seen receipts, typing indicators)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatUserDTO {
    pub user_id: String,
    pub chat_id: String,
}

/// Server -> client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    ReceiveMessage(MessageDTO),
    ChatUpdated(ChatUpdatedDTO),
    MessagesSeen(ChatUserDTO),
    UserTyping(ChatUserDTO),
    UserStoppedTyping(ChatUserDTO),
    Error { message: String },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Event name as it appears on the wire
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::ReceiveMessage(_) => "receive_message",
            ServerEvent::ChatUpdated(_) => "chat_updated",
            ServerEvent::MessagesSeen(_) => "messages_seen",
            ServerEvent::UserTyping(_) => "user_typing",
            ServerEvent::UserStoppedTyping(_) => "user_stopped_typing",
            ServerEvent::Error { .. } => "error",
        }
    }
}
