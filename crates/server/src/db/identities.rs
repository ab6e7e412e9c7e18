//! `PostgreSQL` credential repository.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use ledgerdesk_core::{Email, ProfileId};

use super::{IdentityRepository, RepositoryError};
use crate::models::AuthIdentity;

/// Internal row type for `PostgreSQL` credential queries.
#[derive(sqlx::FromRow)]
struct IdentityRow {
    id: Uuid,
    email: String,
    password_hash: String,
}

impl TryFrom<IdentityRow> for AuthIdentity {
    type Error = RepositoryError;

    fn try_from(row: IdentityRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email for identity {}: {e}", row.id))
        })?;

        Ok(Self {
            id: ProfileId::new(row.id),
            email,
            password_hash: row.password_hash,
        })
    }
}

/// Credential repository backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgIdentityRepository {
    pool: PgPool,
}

impl PgIdentityRepository {
    /// Create a new credential repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityRepository for PgIdentityRepository {
    async fn create(
        &self,
        id: ProfileId,
        email: &Email,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO auth_identities (id, email, password_hash) VALUES ($1, $2, $3)")
            .bind(id.as_uuid())
            .bind(email.as_str())
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| super::map_unique_violation(e, "email"))?;

        Ok(())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<AuthIdentity>, RepositoryError> {
        let row = sqlx::query_as::<_, IdentityRow>(
            "SELECT id, email, password_hash FROM auth_identities WHERE email = $1",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn set_password(
        &self,
        id: ProfileId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE auth_identities SET password_hash = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete(&self, id: ProfileId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM auth_identities WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
