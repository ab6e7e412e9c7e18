//! Persistence layer.
//!
//! # Tables
//!
//! - `auth_identities` - Email + Argon2 password hash per login
//! - `profiles` - Customers and admins
//! - `accounts` - Bank accounts owned by profiles
//! - `chats` - Support threads between a customer and their admin
//! - `messages` - Chat messages with seen-state
//! - `tower_sessions.session` - Session storage
//!
//! Each table has a repository trait with a `PostgreSQL` implementation
//! and an in-memory one ([`memory::InMemoryStore`]) used by tests.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p ledgerdesk-cli -- migrate
//! ```

pub mod accounts;
pub mod chats;
pub mod identities;
pub mod memory;
pub mod messages;
pub mod profiles;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use ledgerdesk_core::{
    AccountId, AccountStatus, ChatId, ChatStatus, Email, MessageId, ProfileId, Role,
};

use crate::models::{
    Account, AccountUpdate, AuthIdentity, Chat, ChatSummary, Message, MessageView, NewAccount,
    NewMessage, NewProfile, Profile, ProfileUpdate,
};

pub use accounts::PgAccountRepository;
pub use chats::PgChatRepository;
pub use identities::PgIdentityRepository;
pub use memory::InMemoryStore;
pub use messages::PgMessageRepository;
pub use profiles::PgProfileRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Half-open time range `[start, end)` used for period counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CountWindow {
    /// Whether `at` falls inside the window.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// Count and balance sum over accounts that are not suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccountTotals {
    pub count: i64,
    pub balance: Decimal,
}

// =============================================================================
// Repository Traits
// =============================================================================

/// Profile persistence.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Insert a profile.
    async fn create(&self, profile: NewProfile) -> Result<Profile, RepositoryError>;

    /// Get a profile by ID.
    async fn get(&self, id: ProfileId) -> Result<Option<Profile>, RepositoryError>;

    /// List all profiles, newest first.
    async fn list(&self) -> Result<Vec<Profile>, RepositoryError>;

    /// Apply a partial update. Returns `NotFound` if the profile is absent.
    async fn update(
        &self,
        id: ProfileId,
        update: &ProfileUpdate,
    ) -> Result<Profile, RepositoryError>;

    /// Replace the avatar URL. Returns `NotFound` if the profile is absent.
    async fn set_avatar_url(&self, id: ProfileId, url: &str) -> Result<Profile, RepositoryError>;

    /// Delete a profile. Returns `NotFound` if the profile is absent.
    async fn delete(&self, id: ProfileId) -> Result<(), RepositoryError>;

    /// Count profiles with role `user`, optionally only those created in `window`.
    async fn count_users(&self, window: Option<CountWindow>) -> Result<i64, RepositoryError>;

    /// Cheap round trip used by the readiness probe.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Account persistence.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Open an account.
    async fn create(&self, account: NewAccount) -> Result<Account, RepositoryError>;

    /// Get an account by ID.
    async fn get(&self, id: AccountId) -> Result<Option<Account>, RepositoryError>;

    /// List all accounts, newest first.
    async fn list(&self) -> Result<Vec<Account>, RepositoryError>;

    /// List one profile's accounts, oldest first.
    async fn list_for_user(&self, user_id: ProfileId) -> Result<Vec<Account>, RepositoryError>;

    /// Apply a partial update. Returns `NotFound` if the account is absent.
    async fn update(
        &self,
        id: AccountId,
        update: &AccountUpdate,
    ) -> Result<Account, RepositoryError>;

    /// Delete an account. Returns `NotFound` if the account is absent.
    async fn delete(&self, id: AccountId) -> Result<(), RepositoryError>;

    /// Delete every account a profile owns. Returns the number removed.
    async fn delete_for_user(&self, user_id: ProfileId) -> Result<u64, RepositoryError>;

    /// Count and total balance of accounts whose status is not `suspended`.
    async fn totals(&self) -> Result<AccountTotals, RepositoryError>;

    /// Count accounts created in `window`.
    async fn count_created(&self, window: CountWindow) -> Result<i64, RepositoryError>;
}

/// Chat persistence.
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Insert a chat with status `active`.
    async fn create(
        &self,
        user_id: ProfileId,
        admin_id: ProfileId,
        title: &str,
    ) -> Result<Chat, RepositoryError>;

    /// Get a chat by ID.
    async fn get(&self, id: ChatId) -> Result<Option<Chat>, RepositoryError>;

    /// Oldest chat between `user_id` and `admin_id`, if any.
    async fn find_for_pair(
        &self,
        user_id: ProfileId,
        admin_id: ProfileId,
    ) -> Result<Option<Chat>, RepositoryError>;

    /// Chats where the profile is the customer, most recently active first.
    async fn list_for_user(&self, user_id: ProfileId) -> Result<Vec<Chat>, RepositoryError>;

    /// Admin inbox, optionally filtered by status, most recently active first.
    async fn list_summaries(
        &self,
        viewer: ProfileId,
        status: Option<ChatStatus>,
    ) -> Result<Vec<ChatSummary>, RepositoryError>;

    /// Set `updated_at`. Returns `NotFound` if the chat is absent.
    async fn touch(&self, id: ChatId, at: DateTime<Utc>) -> Result<(), RepositoryError>;

    /// Write status and assignment together and bump `updated_at`.
    async fn set_status(
        &self,
        id: ChatId,
        status: ChatStatus,
        admin_id: Option<ProfileId>,
    ) -> Result<Chat, RepositoryError>;

    /// Delete a chat and, by cascade, its messages.
    async fn delete(&self, id: ChatId) -> Result<(), RepositoryError>;

    /// Delete every chat a profile is the customer of. Returns the number removed.
    async fn delete_for_user(&self, user_id: ProfileId) -> Result<u64, RepositoryError>;

    /// Count chats in a status.
    async fn count_by_status(&self, status: ChatStatus) -> Result<i64, RepositoryError>;

    /// Count chats created in `window`.
    async fn count_created(&self, window: CountWindow) -> Result<i64, RepositoryError>;
}

/// Message persistence.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Append a message.
    async fn insert(&self, message: NewMessage) -> Result<Message, RepositoryError>;

    /// Get a message by ID.
    async fn get(&self, id: MessageId) -> Result<Option<Message>, RepositoryError>;

    /// Get the messages among `ids` that exist, in no particular order.
    async fn get_many(&self, ids: &[MessageId]) -> Result<Vec<Message>, RepositoryError>;

    /// A message joined with its sender's profile.
    async fn get_view(&self, id: MessageId) -> Result<Option<MessageView>, RepositoryError>;

    /// All messages of a chat with sender fields, ordered by `(created_at, id)`.
    async fn list_views(&self, chat_id: ChatId) -> Result<Vec<MessageView>, RepositoryError>;

    /// Replace content and bump `updated_at`. Returns `NotFound` if absent.
    async fn update_content(&self, id: MessageId, content: &str) -> Result<(), RepositoryError>;

    /// Set seen-state on the messages among `ids` that are still unseen.
    ///
    /// Returns the IDs that were actually updated.
    async fn mark_seen(
        &self,
        ids: &[MessageId],
        seen_by: ProfileId,
    ) -> Result<Vec<MessageId>, RepositoryError>;

    /// Total number of messages.
    async fn count_all(&self) -> Result<i64, RepositoryError>;

    /// Unseen messages in chats where `profile_id` participates and did not send.
    async fn count_unseen_for(&self, profile_id: ProfileId) -> Result<i64, RepositoryError>;
}

/// Credential persistence.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// Insert a credential. Returns `Conflict` if the email is taken.
    async fn create(
        &self,
        id: ProfileId,
        email: &Email,
        password_hash: &str,
    ) -> Result<(), RepositoryError>;

    /// Look up a credential by email.
    async fn find_by_email(&self, email: &Email) -> Result<Option<AuthIdentity>, RepositoryError>;

    /// Replace a password hash. Returns `NotFound` if absent.
    async fn set_password(&self, id: ProfileId, password_hash: &str)
    -> Result<(), RepositoryError>;

    /// Delete a credential. Returns `NotFound` if absent.
    async fn delete(&self, id: ProfileId) -> Result<(), RepositoryError>;
}

// =============================================================================
// Repository Bundle
// =============================================================================

/// All repositories, shared by handlers through `AppState`.
#[derive(Clone)]
pub struct Repositories {
    pub profiles: Arc<dyn ProfileRepository>,
    pub accounts: Arc<dyn AccountRepository>,
    pub chats: Arc<dyn ChatRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub identities: Arc<dyn IdentityRepository>,
}

impl Repositories {
    /// `PostgreSQL`-backed repositories sharing one pool.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            profiles: Arc::new(PgProfileRepository::new(pool.clone())),
            accounts: Arc::new(PgAccountRepository::new(pool.clone())),
            chats: Arc::new(PgChatRepository::new(pool.clone())),
            messages: Arc::new(PgMessageRepository::new(pool.clone())),
            identities: Arc::new(PgIdentityRepository::new(pool.clone())),
        }
    }

    /// Repositories backed by a single in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_store(&InMemoryStore::new())
    }

    /// Repositories sharing an existing in-memory store.
    #[must_use]
    pub fn from_store(store: &InMemoryStore) -> Self {
        Self {
            profiles: Arc::new(store.clone()),
            accounts: Arc::new(store.clone()),
            chats: Arc::new(store.clone()),
            messages: Arc::new(store.clone()),
            identities: Arc::new(store.clone()),
        }
    }
}

impl std::fmt::Debug for Repositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repositories").finish_non_exhaustive()
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
pub(crate) fn map_unique_violation(err: sqlx::Error, what: &str) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            RepositoryError::Conflict(format!("{what} already exists"))
        }
        _ => RepositoryError::Database(err),
    }
}

/// Status filter used by the account totals.
pub(crate) const fn counts_toward_totals(status: AccountStatus) -> bool {
    !matches!(status, AccountStatus::Suspended)
}

/// Role counted as a customer in dashboard totals.
pub(crate) const fn is_customer(role: Role) -> bool {
    matches!(role, Role::User)
}
