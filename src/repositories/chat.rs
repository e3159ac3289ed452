//! ChatRepository - Conversations and their participant snapshots

use super::{Read, db_time, now};
use crate::dtos::CreateConversationDTO;
use crate::entities::{Chat, Conversation, Participant};
use sqlx::{Error, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info, instrument};
use uuid::Uuid;

const CHAT_COLUMNS: &str = r#"
    chat_id,
    farmer_id,
    consumer_id,
    context_type,
    context_reference_id,
    last_message_content,
    last_message_sender_id,
    last_message_at,
    created_at,
    updated_at
"#;

// CHAT REPOSITORY
pub struct ChatRepository {
    connection_pool: SqlitePool,
}

impl ChatRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    /// Returns the conversation between this farmer and consumer, creating it
    /// if it does not exist yet.
    ///
    /// The `UNIQUE(farmer_id, consumer_id)` constraint makes the insert a no-op
    /// when another request created the pair first; participant snapshots are
    /// only written by the request whose insert succeeded. The stored row is
    /// then read back, so every concurrent caller observes the same chat.
    #[instrument(skip(self, data))]
    pub async fn create_or_get(&self, data: &CreateConversationDTO) -> Result<Conversation, Error> {
        let (farmer, consumer) = data.farmer_and_consumer().ok_or_else(|| {
            Error::Protocol("a conversation needs one farmer and one consumer".into())
        })?;

        let chat_id = Uuid::new_v4().to_string();
        let created_at = db_time(&now());
        let (context_type, reference_id) = match &data.context {
            Some(ctx) => (Some(ctx.context_type), ctx.reference_id.clone()),
            None => (None, None),
        };

        let mut tx = self.connection_pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO chats (chat_id, farmer_id, consumer_id, context_type, context_reference_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (farmer_id, consumer_id) DO NOTHING
            "#,
        )
        .bind(&chat_id)
        .bind(&farmer.user_id)
        .bind(&consumer.user_id)
        .bind(context_type)
        .bind(reference_id)
        .bind(&created_at)
        .bind(&created_at)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        if inserted {
            for (position, participant) in data.participants.iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO chat_participants (chat_id, user_id, role, name, profile_photo, position)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&chat_id)
                .bind(&participant.user_id)
                .bind(participant.role)
                .bind(&participant.name)
                .bind(&participant.profile_photo)
                .bind(position as i64)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        if inserted {
            info!(chat_id = %chat_id, "Conversation created");
        } else {
            debug!("Conversation already exists, reusing it");
        }

        self.find_by_pair(&farmer.user_id, &consumer.user_id)
            .await?
            .ok_or(Error::RowNotFound)
    }

    #[instrument(skip(self))]
    pub async fn find_by_pair(
        &self,
        farmer_id: &str,
        consumer_id: &str,
    ) -> Result<Option<Conversation>, Error> {
        let chat = sqlx::query_as::<_, Chat>(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE farmer_id = ? AND consumer_id = ?"
        ))
        .bind(farmer_id)
        .bind(consumer_id)
        .fetch_optional(&self.connection_pool)
        .await?;

        match chat {
            Some(chat) => self.with_participants(chat).await.map(Some),
            None => Ok(None),
        }
    }

    /// Every conversation of `user_id`, most recently updated first
    #[instrument(skip(self))]
    pub async fn find_many_by_user_id(&self, user_id: &str) -> Result<Vec<Conversation>, Error> {
        let chats = sqlx::query_as::<_, Chat>(&format!(
            r#"
            SELECT {CHAT_COLUMNS}
            FROM chats
            WHERE farmer_id = ? OR consumer_id = ?
            ORDER BY updated_at DESC, rowid DESC
            "#
        ))
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.connection_pool)
        .await?;

        let participants = sqlx::query_as::<_, Participant>(
            r#"
            SELECT p.chat_id, p.user_id, p.role, p.name, p.profile_photo, p.position
            FROM chat_participants p
            INNER JOIN chats c ON c.chat_id = p.chat_id
            WHERE c.farmer_id = ? OR c.consumer_id = ?
            ORDER BY p.chat_id, p.position
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.connection_pool)
        .await?;

        let mut by_chat: HashMap<String, Vec<Participant>> = HashMap::new();
        for participant in participants {
            by_chat
                .entry(participant.chat_id.clone())
                .or_default()
                .push(participant);
        }

        debug!(count = chats.len(), "Conversations loaded");

        Ok(chats
            .into_iter()
            .map(|chat| {
                let participants = by_chat.remove(&chat.chat_id).unwrap_or_default();
                Conversation { chat, participants }
            })
            .collect())
    }

    async fn with_participants(&self, chat: Chat) -> Result<Conversation, Error> {
        let participants = sqlx::query_as::<_, Participant>(
            r#"
            SELECT chat_id, user_id, role, name, profile_photo, position
            FROM chat_participants
            WHERE chat_id = ?
            ORDER BY position
            "#,
        )
        .bind(&chat.chat_id)
        .fetch_all(&self.connection_pool)
        .await?;

        Ok(Conversation { chat, participants })
    }
}

impl Read<Conversation, str> for ChatRepository {
    #[instrument(skip(self))]
    async fn read(&self, id: &str) -> Result<Option<Conversation>, Error> {
        let chat = sqlx::query_as::<_, Chat>(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE chat_id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await?;

        match chat {
            Some(chat) => self.with_participants(chat).await.map(Some),
            None => {
                debug!("Chat not found");
                Ok(None)
            }
        }
    }
}
