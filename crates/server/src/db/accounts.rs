//! `PostgreSQL` account repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use ledgerdesk_core::{AccountId, AccountStatus, AccountType, CurrencyCode, ProfileId};

use super::{AccountRepository, AccountTotals, CountWindow, RepositoryError};
use crate::models::{Account, AccountUpdate, NewAccount};

const ACCOUNT_COLUMNS: &str = "id, user_id, account_number, account_type, balance, currency, \
                               status, created_at, updated_at";

/// Internal row type for `PostgreSQL` account queries.
#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    user_id: Uuid,
    account_number: String,
    account_type: AccountType,
    balance: Decimal,
    currency: String,
    status: AccountStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = RepositoryError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let currency = row.currency.parse::<CurrencyCode>().map_err(|e| {
            RepositoryError::DataCorruption(format!("account {}: {e}", row.id))
        })?;

        Ok(Self {
            id: AccountId::new(row.id),
            user_id: ProfileId::new(row.user_id),
            account_number: row.account_number,
            account_type: row.account_type,
            balance: row.balance,
            currency,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Account repository backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    /// Create a new account repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn create(&self, account: NewAccount) -> Result<Account, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "INSERT INTO accounts (id, user_id, account_number, account_type, balance, currency)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(AccountId::generate().as_uuid())
        .bind(account.user_id.as_uuid())
        .bind(&account.account_number)
        .bind(account.account_type)
        .bind(account.balance)
        .bind(account.currency.code())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn get(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self) -> Result<Vec<Account>, RepositoryError> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY created_at DESC, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_for_user(&self, user_id: ProfileId) -> Result<Vec<Account>, RepositoryError> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts
             WHERE user_id = $1
             ORDER BY created_at, id"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update(
        &self,
        id: AccountId,
        update: &AccountUpdate,
    ) -> Result<Account, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "UPDATE accounts
             SET balance = COALESCE($2, balance),
                 status = COALESCE($3, status),
                 currency = COALESCE($4, currency),
                 account_type = COALESCE($5, account_type),
                 updated_at = now()
             WHERE id = $1
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(update.balance)
        .bind(update.status)
        .bind(update.currency.map(CurrencyCode::code))
        .bind(update.account_type)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn delete(&self, id: AccountId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete_for_user(&self, user_id: ProfileId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM accounts WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn totals(&self) -> Result<AccountTotals, RepositoryError> {
        let (count, balance): (i64, Option<Decimal>) = sqlx::query_as(
            "SELECT COUNT(*), SUM(balance) FROM accounts WHERE status <> 'suspended'",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(AccountTotals {
            count,
            balance: balance.unwrap_or(Decimal::ZERO),
        })
    }

    async fn count_created(&self, window: CountWindow) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM accounts WHERE created_at >= $1 AND created_at < $2",
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
