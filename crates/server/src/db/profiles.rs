//! `PostgreSQL` profile repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use ledgerdesk_core::{Email, ProfileId, Role};

use super::{CountWindow, ProfileRepository, RepositoryError};
use crate::models::{NewProfile, Profile, ProfileUpdate};

// =============================================================================
// Internal Row Types
// =============================================================================

const PROFILE_COLUMNS: &str = "id, full_name, email, role, created_by_admin_id, avatar_url, \
                               phone, created_at, updated_at";

/// Internal row type for `PostgreSQL` profile queries.
#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    full_name: String,
    email: String,
    role: Role,
    created_by_admin_id: Option<Uuid>,
    avatar_url: Option<String>,
    phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = RepositoryError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email for profile {}: {e}", row.id))
        })?;

        Ok(Self {
            id: ProfileId::new(row.id),
            full_name: row.full_name,
            email,
            role: row.role,
            created_by_admin_id: row.created_by_admin_id.map(ProfileId::new),
            avatar_url: row.avatar_url,
            phone: row.phone,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Profile repository backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    /// Create a new profile repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn create(&self, profile: NewProfile) -> Result<Profile, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "INSERT INTO profiles (id, full_name, email, role, created_by_admin_id, phone)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(profile.id.as_uuid())
        .bind(&profile.full_name)
        .bind(profile.email.as_str())
        .bind(profile.role)
        .bind(profile.created_by_admin_id.map(|id| id.as_uuid()))
        .bind(&profile.phone)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| super::map_unique_violation(e, "profile"))?;

        row.try_into()
    }

    async fn get(&self, id: ProfileId) -> Result<Option<Profile>, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self) -> Result<Vec<Profile>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY created_at DESC, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update(
        &self,
        id: ProfileId,
        update: &ProfileUpdate,
    ) -> Result<Profile, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "UPDATE profiles
             SET full_name = COALESCE($2, full_name),
                 phone = COALESCE($3, phone),
                 role = COALESCE($4, role),
                 updated_at = now()
             WHERE id = $1
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(&update.full_name)
        .bind(&update.phone)
        .bind(update.role)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn set_avatar_url(&self, id: ProfileId, url: &str) -> Result<Profile, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "UPDATE profiles SET avatar_url = $2, updated_at = now()
             WHERE id = $1
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(url)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn delete(&self, id: ProfileId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn count_users(&self, window: Option<CountWindow>) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM profiles
             WHERE role = 'user'
               AND ($1::timestamptz IS NULL OR created_at >= $1)
               AND ($2::timestamptz IS NULL OR created_at < $2)",
        )
        .bind(window.map(|w| w.start))
        .bind(window.map(|w| w.end))
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
