//! `PostgreSQL` chat repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use ledgerdesk_core::{ChatId, ChatStatus, ProfileId};

use super::{ChatRepository, CountWindow, RepositoryError};
use crate::models::{Chat, ChatSummary};

// =============================================================================
// Internal Row Types
// =============================================================================

const CHAT_COLUMNS: &str = "id, user_id, admin_id, title, status, created_at, updated_at";

/// Internal row type for `PostgreSQL` chat queries.
#[derive(Debug, sqlx::FromRow)]
struct ChatRow {
    id: Uuid,
    user_id: Uuid,
    admin_id: Option<Uuid>,
    title: String,
    status: ChatStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ChatRow> for Chat {
    fn from(row: ChatRow) -> Self {
        Self {
            id: ChatId::new(row.id),
            user_id: ProfileId::new(row.user_id),
            admin_id: row.admin_id.map(ProfileId::new),
            title: row.title,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Internal row type for the admin inbox query.
#[derive(Debug, sqlx::FromRow)]
struct ChatSummaryRow {
    #[sqlx(flatten)]
    chat: ChatRow,
    user_name: Option<String>,
    user_email: Option<String>,
    unseen_count: i64,
    last_message: Option<String>,
    last_message_at: Option<DateTime<Utc>>,
}

impl From<ChatSummaryRow> for ChatSummary {
    fn from(row: ChatSummaryRow) -> Self {
        Self {
            chat: row.chat.into(),
            user_name: row.user_name,
            user_email: row.user_email,
            unseen_count: row.unseen_count,
            last_message: row.last_message,
            last_message_at: row.last_message_at,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Chat repository backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgChatRepository {
    pool: PgPool,
}

impl PgChatRepository {
    /// Create a new chat repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    async fn create(
        &self,
        user_id: ProfileId,
        admin_id: ProfileId,
        title: &str,
    ) -> Result<Chat, RepositoryError> {
        let row = sqlx::query_as::<_, ChatRow>(&format!(
            "INSERT INTO chats (id, user_id, admin_id, title, status)
             VALUES ($1, $2, $3, $4, 'active')
             RETURNING {CHAT_COLUMNS}"
        ))
        .bind(ChatId::generate().as_uuid())
        .bind(user_id.as_uuid())
        .bind(admin_id.as_uuid())
        .bind(title)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get(&self, id: ChatId) -> Result<Option<Chat>, RepositoryError> {
        let row = sqlx::query_as::<_, ChatRow>(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_for_pair(
        &self,
        user_id: ProfileId,
        admin_id: ProfileId,
    ) -> Result<Option<Chat>, RepositoryError> {
        let row = sqlx::query_as::<_, ChatRow>(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats
             WHERE user_id = $1 AND admin_id = $2
             ORDER BY created_at, id
             LIMIT 1"
        ))
        .bind(user_id.as_uuid())
        .bind(admin_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_for_user(&self, user_id: ProfileId) -> Result<Vec<Chat>, RepositoryError> {
        let rows = sqlx::query_as::<_, ChatRow>(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats
             WHERE user_id = $1
             ORDER BY updated_at DESC, id"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_summaries(
        &self,
        viewer: ProfileId,
        status: Option<ChatStatus>,
    ) -> Result<Vec<ChatSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, ChatSummaryRow>(
            r"
            SELECT c.id, c.user_id, c.admin_id, c.title, c.status, c.created_at, c.updated_at,
                   p.full_name AS user_name,
                   p.email AS user_email,
                   (SELECT COUNT(*) FROM messages m
                     WHERE m.chat_id = c.id AND m.seen_at IS NULL AND m.sender_id <> $1)
                     AS unseen_count,
                   last.content AS last_message,
                   last.created_at AS last_message_at
            FROM chats c
            LEFT JOIN profiles p ON p.id = c.user_id
            LEFT JOIN LATERAL (
                SELECT content, created_at FROM messages
                WHERE chat_id = c.id
                ORDER BY created_at DESC, id DESC
                LIMIT 1
            ) last ON TRUE
            WHERE ($2::chat_status IS NULL OR c.status = $2)
            ORDER BY c.updated_at DESC, c.id
            ",
        )
        .bind(viewer.as_uuid())
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn touch(&self, id: ChatId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE chats SET updated_at = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(at)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn set_status(
        &self,
        id: ChatId,
        status: ChatStatus,
        admin_id: Option<ProfileId>,
    ) -> Result<Chat, RepositoryError> {
        let row = sqlx::query_as::<_, ChatRow>(&format!(
            "UPDATE chats SET status = $2, admin_id = $3, updated_at = now()
             WHERE id = $1
             RETURNING {CHAT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(status)
        .bind(admin_id.map(|a| a.as_uuid()))
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn delete(&self, id: ChatId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM chats WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete_for_user(&self, user_id: ProfileId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM chats WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn count_by_status(&self, status: ChatStatus) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chats WHERE status = $1")
            .bind(status)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn count_created(&self, window: CountWindow) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM chats WHERE created_at >= $1 AND created_at < $2",
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
