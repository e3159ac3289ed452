//! MessageRepository - Messages and seen receipts

use super::{Create, db_time, now};
use crate::dtos::CreateMessageDTO;
use crate::entities::{Message, SeenReceipt};
use chrono::{DateTime, TimeDelta, Utc};
use sqlx::{Error, QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, instrument};
use uuid::Uuid;

// MESSAGE REPO
pub struct MessageRepository {
    connection_pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    /// One page of a chat's history.
    ///
    /// Pages are counted from the newest message (page 1 = the `limit` most
    /// recent ones) but each page is returned oldest first, so the client can
    /// render it top to bottom.
    #[instrument(skip(self))]
    pub async fn find_page(&self, chat_id: &str, page: u32, limit: u32) -> Result<Vec<Message>, Error> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(limit);

        let mut messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT message_id, chat_id, sender_id, sender_role, sender_name, content, created_at
            FROM messages
            WHERE chat_id = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(chat_id)
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(&self.connection_pool)
        .await?;

        messages.reverse();
        Ok(messages)
    }

    /// Seen receipts of the given messages, grouped by message id
    #[instrument(skip(self, message_ids), fields(count = message_ids.len()))]
    pub async fn find_seen_by(
        &self,
        message_ids: &[String],
    ) -> Result<HashMap<String, Vec<SeenReceipt>>, Error> {
        let mut grouped: HashMap<String, Vec<SeenReceipt>> = HashMap::new();
        if message_ids.is_empty() {
            return Ok(grouped);
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT message_id, user_id, seen_at FROM message_seen WHERE message_id IN (",
        );
        let mut separated = builder.separated(", ");
        for id in message_ids {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated(") ORDER BY seen_at ASC, rowid ASC");

        let receipts: Vec<SeenReceipt> = builder
            .build_query_as()
            .fetch_all(&self.connection_pool)
            .await?;

        for receipt in receipts {
            grouped
                .entry(receipt.message_id.clone())
                .or_default()
                .push(receipt);
        }
        Ok(grouped)
    }

    /// Adds `user_id` to the seen set of every message in the chat sent by
    /// someone else. Already-seen messages are left untouched.
    ///
    /// # Returns
    /// Number of receipts actually added
    #[instrument(skip(self))]
    pub async fn mark_seen(&self, chat_id: &str, user_id: &str) -> Result<u64, Error> {
        let seen_at = db_time(&now());
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO message_seen (message_id, user_id, seen_at)
            SELECT message_id, ?, ?
            FROM messages
            WHERE chat_id = ? AND sender_id <> ?
            "#,
        )
        .bind(user_id)
        .bind(&seen_at)
        .bind(chat_id)
        .bind(user_id)
        .execute(&self.connection_pool)
        .await?;

        debug!(marked = result.rows_affected(), "Messages marked as seen");
        Ok(result.rows_affected())
    }

    /// Messages of the chat not sent by `user_id` and not yet seen by them
    #[instrument(skip(self))]
    pub async fn count_unread(&self, chat_id: &str, user_id: &str) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM messages m
            WHERE m.chat_id = ?
              AND m.sender_id <> ?
              AND NOT EXISTS (
                  SELECT 1 FROM message_seen s
                  WHERE s.message_id = m.message_id AND s.user_id = ?
              )
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_one(&self.connection_pool)
        .await
    }
}

impl Create<Message, CreateMessageDTO> for MessageRepository {
    /// Persists the message, the sender's own seen receipt and the chat's
    /// `lastMessage` in one transaction. Nothing is written if any step fails.
    ///
    /// The timestamp is taken only once the transaction holds the database
    /// write lock, and is kept strictly after the chat's previous message, so
    /// commit order, `created_at` order and `lastMessage` always agree.
    #[instrument(skip(self, data), fields(chat_id = %data.chat_id, sender_id = %data.sender_id))]
    async fn create(&self, data: &CreateMessageDTO) -> Result<Message, Error> {
        let mut tx = self.connection_pool.begin().await?;

        // first statement is a write: it takes the lock (waiting on busy_timeout)
        let previous: Option<DateTime<Utc>> = sqlx::query_scalar(
            "UPDATE chats SET updated_at = updated_at WHERE chat_id = ? RETURNING last_message_at",
        )
        .bind(&data.chat_id)
        .fetch_optional(&mut *tx)
        .await?
        // dropping the transaction rolls back
        .ok_or(Error::RowNotFound)?;

        let mut created_at = now();
        if let Some(previous) = previous {
            if created_at <= previous {
                created_at = previous + TimeDelta::microseconds(1);
            }
        }

        let message = Message {
            message_id: Uuid::new_v4().to_string(),
            chat_id: data.chat_id.clone(),
            sender_id: data.sender_id.clone(),
            sender_role: data.sender_role,
            sender_name: data.sender_name.clone(),
            content: data.content.clone(),
            created_at,
        };
        let created_at = db_time(&message.created_at);

        sqlx::query(
            r#"
            INSERT INTO messages (message_id, chat_id, sender_id, sender_role, sender_name, content, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&message.message_id)
        .bind(&message.chat_id)
        .bind(&message.sender_id)
        .bind(message.sender_role)
        .bind(&message.sender_name)
        .bind(&message.content)
        .bind(&created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO message_seen (message_id, user_id, seen_at) VALUES (?, ?, ?)")
            .bind(&message.message_id)
            .bind(&message.sender_id)
            .bind(&created_at)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE chats
            SET last_message_content = ?,
                last_message_sender_id = ?,
                last_message_at = ?,
                updated_at = ?
            WHERE chat_id = ?
            "#,
        )
        .bind(&message.content)
        .bind(&message.sender_id)
        .bind(&created_at)
        .bind(&created_at)
        .bind(&message.chat_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(message_id = %message.message_id, "Message persisted");
        Ok(message)
    }
}
