//! SQLite message store.
//!
//! Implements `MessageStore` from `stockdesk-core` over `chat_messages`.
//! Timestamps are stored as fixed-width RFC 3339 UTC strings so that text
//! ordering matches chronological ordering.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use stockdesk_core::repository::message::MessageStore;
use stockdesk_types::chat::{ChatMessage, NewChatMessage};
use stockdesk_types::error::RepositoryError;
use stockdesk_types::identity::UserId;

use super::pool::DatabasePool;
use super::user::parse_datetime;

const SELECT_MESSAGE: &str =
    "SELECT id, sender_id, receiver_id, content, timestamp, is_read FROM chat_messages";

pub struct SqliteMessageStore {
    pool: DatabasePool,
}

impl SqliteMessageStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<ChatMessage, RepositoryError> {
    let map = |e: sqlx::Error| RepositoryError::Query(e.to_string());
    let timestamp: String = row.try_get("timestamp").map_err(map)?;

    Ok(ChatMessage {
        id: row.try_get("id").map_err(map)?,
        sender_id: UserId(row.try_get("sender_id").map_err(map)?),
        receiver_id: UserId(row.try_get("receiver_id").map_err(map)?),
        content: row.try_get("content").map_err(map)?,
        timestamp: parse_datetime(&timestamp)?,
        is_read: row.try_get("is_read").map_err(map)?,
    })
}

impl MessageStore for SqliteMessageStore {
    async fn insert(&self, message: &NewChatMessage) -> Result<ChatMessage, RepositoryError> {
        let timestamp = format_timestamp(&message.timestamp);

        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO chat_messages (sender_id, receiver_id, content, timestamp, is_read)
             VALUES (?, ?, ?, ?, 0)",
        )
        .bind(message.sender_id.as_i64())
        .bind(message.receiver_id.as_i64())
        .bind(&message.content)
        .bind(&timestamp)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.message().contains("FOREIGN KEY") {
                    return RepositoryError::NotFound;
                }
            }
            RepositoryError::Query(e.to_string())
        })?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(ChatMessage {
            id: result.last_insert_rowid(),
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            content: message.content.clone(),
            timestamp: parse_datetime(&timestamp)?,
            is_read: false,
        })
    }

    async fn mark_read(&self, sender_id: UserId, receiver_id: UserId) -> Result<u64, RepositoryError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let result = sqlx::query(
            "UPDATE chat_messages SET is_read = 1
             WHERE sender_id = ? AND receiver_id = ? AND is_read = 0",
        )
        .bind(sender_id.as_i64())
        .bind(receiver_id.as_i64())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn history(&self, user_a: UserId, user_b: UserId) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_MESSAGE}
             WHERE (sender_id = ? AND receiver_id = ?) OR (sender_id = ? AND receiver_id = ?)
             ORDER BY timestamp ASC, id ASC"
        ))
        .bind(user_a.as_i64())
        .bind(user_b.as_i64())
        .bind(user_b.as_i64())
        .bind(user_a.as_i64())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter().map(row_to_message).collect()
    }

    async fn unread_count_for(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM chat_messages WHERE receiver_id = ? AND is_read = 0",
        )
        .bind(user_id.as_i64())
        .fetch_one(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(count.max(0) as u64)
    }

    async fn unread_grouped_by_sender(
        &self,
        user_id: UserId,
    ) -> Result<BTreeMap<UserId, Vec<ChatMessage>>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_MESSAGE} WHERE receiver_id = ? AND is_read = 0
             ORDER BY sender_id ASC, timestamp ASC, id ASC"
        ))
        .bind(user_id.as_i64())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut grouped: BTreeMap<UserId, Vec<ChatMessage>> = BTreeMap::new();
        for row in &rows {
            let message = row_to_message(row)?;
            grouped.entry(message.sender_id).or_default().push(message);
        }
        Ok(grouped)
    }
}
