//! `PostgreSQL` message repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use ledgerdesk_core::{ChatId, MessageId, MessageType, ProfileId};

use super::{MessageRepository, RepositoryError};
use crate::models::{Message, MessageView, NewMessage};

// =============================================================================
// Internal Row Types
// =============================================================================

const MESSAGE_COLUMNS: &str = "id, chat_id, sender_id, content, message_type, created_at, \
                               updated_at, seen_at, seen_by";

/// Message columns joined with the sender profile, for `FROM messages m`.
const VIEW_SELECT: &str = "SELECT m.id, m.chat_id, m.sender_id, m.content, m.message_type, \
                           m.created_at, m.updated_at, m.seen_at, m.seen_by, \
                           p.full_name AS sender_name, p.avatar_url AS sender_avatar_url \
                           FROM messages m LEFT JOIN profiles p ON p.id = m.sender_id";

/// Internal row type for `PostgreSQL` message queries.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    chat_id: Uuid,
    sender_id: Uuid,
    content: String,
    message_type: MessageType,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    seen_at: Option<DateTime<Utc>>,
    seen_by: Option<Uuid>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Self {
            id: MessageId::new(row.id),
            chat_id: ChatId::new(row.chat_id),
            sender_id: ProfileId::new(row.sender_id),
            content: row.content,
            message_type: row.message_type,
            created_at: row.created_at,
            updated_at: row.updated_at,
            seen_at: row.seen_at,
            seen_by: row.seen_by.map(ProfileId::new),
        }
    }
}

/// Internal row type for messages joined with their sender.
#[derive(Debug, sqlx::FromRow)]
struct MessageViewRow {
    #[sqlx(flatten)]
    message: MessageRow,
    sender_name: Option<String>,
    sender_avatar_url: Option<String>,
}

impl From<MessageViewRow> for MessageView {
    fn from(row: MessageViewRow) -> Self {
        Self {
            message: row.message.into(),
            sender_name: row.sender_name,
            sender_avatar_url: row.sender_avatar_url,
        }
    }
}

fn to_uuids(ids: &[MessageId]) -> Vec<Uuid> {
    ids.iter().map(MessageId::as_uuid).collect()
}

// =============================================================================
// Repository
// =============================================================================

/// Message repository backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    /// Create a new message repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn insert(&self, message: NewMessage) -> Result<Message, RepositoryError> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            "INSERT INTO messages (id, chat_id, sender_id, content, message_type)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(MessageId::generate().as_uuid())
        .bind(message.chat_id.as_uuid())
        .bind(message.sender_id.as_uuid())
        .bind(&message.content)
        .bind(message.message_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn get_many(&self, ids: &[MessageId]) -> Result<Vec<Message>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ANY($1)"
        ))
        .bind(to_uuids(ids))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_view(&self, id: MessageId) -> Result<Option<MessageView>, RepositoryError> {
        let row = sqlx::query_as::<_, MessageViewRow>(&format!("{VIEW_SELECT} WHERE m.id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn list_views(&self, chat_id: ChatId) -> Result<Vec<MessageView>, RepositoryError> {
        let rows = sqlx::query_as::<_, MessageViewRow>(&format!(
            "{VIEW_SELECT} WHERE m.chat_id = $1 ORDER BY m.created_at, m.id"
        ))
        .bind(chat_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_content(&self, id: MessageId, content: &str) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE messages SET content = $2, updated_at = now() WHERE id = $1")
                .bind(id.as_uuid())
                .bind(content)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn mark_seen(
        &self,
        ids: &[MessageId],
        seen_by: ProfileId,
    ) -> Result<Vec<MessageId>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let updated: Vec<Uuid> = sqlx::query_scalar(
            "UPDATE messages SET seen_at = now(), seen_by = $2
             WHERE id = ANY($1) AND seen_at IS NULL
             RETURNING id",
        )
        .bind(to_uuids(ids))
        .bind(seen_by.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(updated.into_iter().map(MessageId::new).collect())
    }

    async fn count_all(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn count_unseen_for(&self, profile_id: ProfileId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages m
             JOIN chats c ON c.id = m.chat_id
             WHERE (c.user_id = $1 OR c.admin_id = $1)
               AND m.sender_id <> $1
               AND m.seen_at IS NULL",
        )
        .bind(profile_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
