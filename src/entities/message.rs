//! Message entity - Single chat message and its seen receipts

use super::enums::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row of the `messages` table. The sender fields are frozen at send time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Message {
    pub message_id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub sender_role: Role,
    pub sender_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Row of the `message_seen` table, at most one per (message, user)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct SeenReceipt {
    pub message_id: String,
    pub user_id: String,
    pub seen_at: DateTime<Utc>,
}
