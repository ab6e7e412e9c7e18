//! In-memory implementation of every repository trait.
//!
//! Mirrors the `PostgreSQL` schema closely enough for service and API
//! tests: `ON DELETE` rules are applied by hand, and timestamps come from a
//! clock that never repeats so ordering by `created_at` is deterministic.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;

use ledgerdesk_core::{AccountId, ChatId, ChatStatus, Email, MessageId, ProfileId};

use super::{
    AccountRepository, AccountTotals, ChatRepository, CountWindow, IdentityRepository,
    MessageRepository, ProfileRepository, RepositoryError, counts_toward_totals, is_customer,
};
use crate::models::{
    Account, AccountUpdate, AuthIdentity, Chat, ChatSummary, Message, MessageView, NewAccount,
    NewMessage, NewProfile, Profile, ProfileUpdate,
};

#[derive(Default)]
struct Tables {
    identities: HashMap<ProfileId, AuthIdentity>,
    profiles: HashMap<ProfileId, Profile>,
    accounts: HashMap<AccountId, Account>,
    chats: HashMap<ChatId, Chat>,
    messages: HashMap<MessageId, Message>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl Tables {
    /// Strictly increasing "now".
    fn now(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_timestamp {
            if now <= last {
                now = last + TimeDelta::microseconds(1);
            }
        }
        self.last_timestamp = Some(now);
        now
    }

    fn view(&self, message: &Message) -> MessageView {
        let sender = self.profiles.get(&message.sender_id);
        MessageView {
            message: message.clone(),
            sender_name: sender.map(|p| p.full_name.clone()),
            sender_avatar_url: sender.and_then(|p| p.avatar_url.clone()),
        }
    }

    fn is_referenced(&self, id: ProfileId) -> bool {
        self.accounts.values().any(|a| a.user_id == id)
            || self.chats.values().any(|c| c.user_id == id)
    }
}

/// Shared in-memory tables. Clones share state.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Sort ascending by a `(timestamp, id)` key, matching `ORDER BY ts, id`.
fn sorted_by_created<T>(
    mut items: Vec<T>,
    key: impl Fn(&T) -> (DateTime<Utc>, uuid::Uuid),
) -> Vec<T> {
    items.sort_by_key(|item| key(item));
    items
}

#[async_trait]
impl ProfileRepository for InMemoryStore {
    async fn create(&self, new: NewProfile) -> Result<Profile, RepositoryError> {
        let mut tables = self.lock();
        if tables.profiles.contains_key(&new.id) {
            return Err(RepositoryError::Conflict("profile already exists".to_string()));
        }

        let now = tables.now();
        let profile = Profile {
            id: new.id,
            full_name: new.full_name,
            email: new.email,
            role: new.role,
            created_by_admin_id: new.created_by_admin_id,
            avatar_url: None,
            phone: new.phone,
            created_at: now,
            updated_at: now,
        };
        tables.profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn get(&self, id: ProfileId) -> Result<Option<Profile>, RepositoryError> {
        Ok(self.lock().profiles.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Profile>, RepositoryError> {
        let profiles: Vec<Profile> = self.lock().profiles.values().cloned().collect();
        let mut profiles = sorted_by_created(profiles, |p| (p.created_at, p.id.as_uuid()));
        profiles.reverse();
        Ok(profiles)
    }

    async fn update(
        &self,
        id: ProfileId,
        update: &ProfileUpdate,
    ) -> Result<Profile, RepositoryError> {
        let mut tables = self.lock();
        let now = tables.now();
        let profile = tables.profiles.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        update.apply(profile);
        profile.updated_at = now;
        Ok(profile.clone())
    }

    async fn set_avatar_url(&self, id: ProfileId, url: &str) -> Result<Profile, RepositoryError> {
        let mut tables = self.lock();
        let now = tables.now();
        let profile = tables.profiles.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        profile.avatar_url = Some(url.to_string());
        profile.updated_at = now;
        Ok(profile.clone())
    }

    async fn delete(&self, id: ProfileId) -> Result<(), RepositoryError> {
        let mut tables = self.lock();
        if !tables.profiles.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        if tables.is_referenced(id) {
            return Err(RepositoryError::Conflict(
                "profile still owns accounts or chats".to_string(),
            ));
        }

        tables.profiles.remove(&id);
        for profile in tables.profiles.values_mut() {
            if profile.created_by_admin_id == Some(id) {
                profile.created_by_admin_id = None;
            }
        }
        for chat in tables.chats.values_mut() {
            if chat.admin_id == Some(id) {
                chat.admin_id = None;
            }
        }
        for message in tables.messages.values_mut() {
            if message.seen_by == Some(id) {
                message.seen_by = None;
            }
        }
        Ok(())
    }

    async fn count_users(&self, window: Option<CountWindow>) -> Result<i64, RepositoryError> {
        let tables = self.lock();
        let count = tables
            .profiles
            .values()
            .filter(|p| is_customer(p.role))
            .filter(|p| window.is_none_or(|w| w.contains(p.created_at)))
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for InMemoryStore {
    async fn create(&self, new: NewAccount) -> Result<Account, RepositoryError> {
        let mut tables = self.lock();
        if !tables.profiles.contains_key(&new.user_id) {
            return Err(RepositoryError::Conflict("account owner does not exist".to_string()));
        }

        let now = tables.now();
        let account = Account {
            id: AccountId::generate(),
            user_id: new.user_id,
            account_number: new.account_number,
            account_type: new.account_type,
            balance: new.balance,
            currency: new.currency,
            status: ledgerdesk_core::AccountStatus::Active,
            created_at: now,
            updated_at: now,
        };
        tables.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn get(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        Ok(self.lock().accounts.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Account>, RepositoryError> {
        let accounts: Vec<Account> = self.lock().accounts.values().cloned().collect();
        let mut accounts = sorted_by_created(accounts, |a| (a.created_at, a.id.as_uuid()));
        accounts.reverse();
        Ok(accounts)
    }

    async fn list_for_user(&self, user_id: ProfileId) -> Result<Vec<Account>, RepositoryError> {
        let accounts: Vec<Account> = self
            .lock()
            .accounts
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        Ok(sorted_by_created(accounts, |a| (a.created_at, a.id.as_uuid())))
    }

    async fn update(
        &self,
        id: AccountId,
        update: &AccountUpdate,
    ) -> Result<Account, RepositoryError> {
        let mut tables = self.lock();
        let now = tables.now();
        let account = tables.accounts.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        update.apply(account);
        account.updated_at = now;
        Ok(account.clone())
    }

    async fn delete(&self, id: AccountId) -> Result<(), RepositoryError> {
        self.lock()
            .accounts
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete_for_user(&self, user_id: ProfileId) -> Result<u64, RepositoryError> {
        let mut tables = self.lock();
        let before = tables.accounts.len();
        tables.accounts.retain(|_, a| a.user_id != user_id);
        Ok(u64::try_from(before - tables.accounts.len()).unwrap_or(u64::MAX))
    }

    async fn totals(&self) -> Result<AccountTotals, RepositoryError> {
        let tables = self.lock();
        let counted: Vec<&Account> = tables
            .accounts
            .values()
            .filter(|a| counts_toward_totals(a.status))
            .collect();

        Ok(AccountTotals {
            count: i64::try_from(counted.len()).unwrap_or(i64::MAX),
            balance: counted.iter().map(|a| a.balance).sum::<Decimal>(),
        })
    }

    async fn count_created(&self, window: CountWindow) -> Result<i64, RepositoryError> {
        let count = self
            .lock()
            .accounts
            .values()
            .filter(|a| window.contains(a.created_at))
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }
}

#[async_trait]
impl ChatRepository for InMemoryStore {
    async fn create(
        &self,
        user_id: ProfileId,
        admin_id: ProfileId,
        title: &str,
    ) -> Result<Chat, RepositoryError> {
        let mut tables = self.lock();
        let now = tables.now();
        let chat = Chat {
            id: ChatId::generate(),
            user_id,
            admin_id: Some(admin_id),
            title: title.to_string(),
            status: ChatStatus::Active,
            created_at: now,
            updated_at: now,
        };
        tables.chats.insert(chat.id, chat.clone());
        Ok(chat)
    }

    async fn get(&self, id: ChatId) -> Result<Option<Chat>, RepositoryError> {
        Ok(self.lock().chats.get(&id).cloned())
    }

    async fn find_for_pair(
        &self,
        user_id: ProfileId,
        admin_id: ProfileId,
    ) -> Result<Option<Chat>, RepositoryError> {
        let chats: Vec<Chat> = self
            .lock()
            .chats
            .values()
            .filter(|c| c.user_id == user_id && c.admin_id == Some(admin_id))
            .cloned()
            .collect();
        Ok(sorted_by_created(chats, |c| (c.created_at, c.id.as_uuid()))
            .into_iter()
            .next())
    }

    async fn list_for_user(&self, user_id: ProfileId) -> Result<Vec<Chat>, RepositoryError> {
        let chats: Vec<Chat> = self
            .lock()
            .chats
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        let mut chats = sorted_by_created(chats, |c| (c.updated_at, c.id.as_uuid()));
        chats.reverse();
        Ok(chats)
    }

    async fn list_summaries(
        &self,
        viewer: ProfileId,
        status: Option<ChatStatus>,
    ) -> Result<Vec<ChatSummary>, RepositoryError> {
        let tables = self.lock();
        let chats: Vec<Chat> = tables
            .chats
            .values()
            .filter(|c| status.is_none_or(|s| c.status == s))
            .cloned()
            .collect();
        let mut chats = sorted_by_created(chats, |c| (c.updated_at, c.id.as_uuid()));
        chats.reverse();

        let summaries = chats
            .into_iter()
            .map(|chat| {
                let owner = tables.profiles.get(&chat.user_id);
                let in_chat: Vec<&Message> = tables
                    .messages
                    .values()
                    .filter(|m| m.chat_id == chat.id)
                    .collect();
                let unseen = in_chat
                    .iter()
                    .filter(|m| m.seen_at.is_none() && m.sender_id != viewer)
                    .count();
                let last = in_chat
                    .iter()
                    .max_by_key(|m| (m.created_at, m.id.as_uuid()))
                    .copied();

                ChatSummary {
                    user_name: owner.map(|p| p.full_name.clone()),
                    user_email: owner.map(|p| p.email.to_string()),
                    unseen_count: i64::try_from(unseen).unwrap_or(i64::MAX),
                    last_message: last.map(|m| m.content.clone()),
                    last_message_at: last.map(|m| m.created_at),
                    chat,
                }
            })
            .collect();

        Ok(summaries)
    }

    async fn touch(&self, id: ChatId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let mut tables = self.lock();
        let chat = tables.chats.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        chat.updated_at = at;
        Ok(())
    }

    async fn set_status(
        &self,
        id: ChatId,
        status: ChatStatus,
        admin_id: Option<ProfileId>,
    ) -> Result<Chat, RepositoryError> {
        let mut tables = self.lock();
        let now = tables.now();
        let chat = tables.chats.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        chat.status = status;
        chat.admin_id = admin_id;
        chat.updated_at = now;
        Ok(chat.clone())
    }

    async fn delete(&self, id: ChatId) -> Result<(), RepositoryError> {
        let mut tables = self.lock();
        if tables.chats.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        tables.messages.retain(|_, m| m.chat_id != id);
        Ok(())
    }

    async fn delete_for_user(&self, user_id: ProfileId) -> Result<u64, RepositoryError> {
        let mut tables = self.lock();
        let removed: Vec<ChatId> = tables
            .chats
            .values()
            .filter(|c| c.user_id == user_id)
            .map(|c| c.id)
            .collect();
        tables.chats.retain(|_, c| c.user_id != user_id);
        tables.messages.retain(|_, m| !removed.contains(&m.chat_id));
        Ok(u64::try_from(removed.len()).unwrap_or(u64::MAX))
    }

    async fn count_by_status(&self, status: ChatStatus) -> Result<i64, RepositoryError> {
        let count = self
            .lock()
            .chats
            .values()
            .filter(|c| c.status == status)
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn count_created(&self, window: CountWindow) -> Result<i64, RepositoryError> {
        let count = self
            .lock()
            .chats
            .values()
            .filter(|c| window.contains(c.created_at))
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }
}

#[async_trait]
impl MessageRepository for InMemoryStore {
    async fn insert(&self, new: NewMessage) -> Result<Message, RepositoryError> {
        let mut tables = self.lock();
        if !tables.chats.contains_key(&new.chat_id) {
            return Err(RepositoryError::Conflict("chat does not exist".to_string()));
        }

        let now = tables.now();
        let message = Message {
            id: MessageId::generate(),
            chat_id: new.chat_id,
            sender_id: new.sender_id,
            content: new.content,
            message_type: new.message_type,
            created_at: now,
            updated_at: now,
            seen_at: None,
            seen_by: None,
        };
        tables.messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn get(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        Ok(self.lock().messages.get(&id).cloned())
    }

    async fn get_many(&self, ids: &[MessageId]) -> Result<Vec<Message>, RepositoryError> {
        let tables = self.lock();
        Ok(ids
            .iter()
            .filter_map(|id| tables.messages.get(id).cloned())
            .collect())
    }

    async fn get_view(&self, id: MessageId) -> Result<Option<MessageView>, RepositoryError> {
        let tables = self.lock();
        Ok(tables.messages.get(&id).map(|m| tables.view(m)))
    }

    async fn list_views(&self, chat_id: ChatId) -> Result<Vec<MessageView>, RepositoryError> {
        let tables = self.lock();
        let messages: Vec<Message> = tables
            .messages
            .values()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect();
        Ok(sorted_by_created(messages, |m| (m.created_at, m.id.as_uuid()))
            .iter()
            .map(|m| tables.view(m))
            .collect())
    }

    async fn update_content(&self, id: MessageId, content: &str) -> Result<(), RepositoryError> {
        let mut tables = self.lock();
        let now = tables.now();
        let message = tables.messages.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        message.content = content.to_string();
        message.updated_at = now;
        Ok(())
    }

    async fn mark_seen(
        &self,
        ids: &[MessageId],
        seen_by: ProfileId,
    ) -> Result<Vec<MessageId>, RepositoryError> {
        let mut tables = self.lock();
        let now = tables.now();
        let mut updated = Vec::new();
        for id in ids {
            match tables.messages.get_mut(id) {
                Some(message) if message.seen_at.is_none() => {
                    message.seen_at = Some(now);
                    message.seen_by = Some(seen_by);
                    updated.push(*id);
                }
                _ => {}
            }
        }
        Ok(updated)
    }

    async fn count_all(&self) -> Result<i64, RepositoryError> {
        Ok(i64::try_from(self.lock().messages.len()).unwrap_or(i64::MAX))
    }

    async fn count_unseen_for(&self, profile_id: ProfileId) -> Result<i64, RepositoryError> {
        let tables = self.lock();
        let count = tables
            .messages
            .values()
            .filter(|m| m.seen_at.is_none() && m.sender_id != profile_id)
            .filter(|m| {
                tables
                    .chats
                    .get(&m.chat_id)
                    .is_some_and(|c| c.is_participant(profile_id))
            })
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }
}

#[async_trait]
impl IdentityRepository for InMemoryStore {
    async fn create(
        &self,
        id: ProfileId,
        email: &Email,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.lock();
        if tables.identities.values().any(|i| &i.email == email) {
            return Err(RepositoryError::Conflict("email already exists".to_string()));
        }
        tables.identities.insert(
            id,
            AuthIdentity {
                id,
                email: email.clone(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<AuthIdentity>, RepositoryError> {
        Ok(self
            .lock()
            .identities
            .values()
            .find(|i| &i.email == email)
            .cloned())
    }

    async fn set_password(
        &self,
        id: ProfileId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.lock();
        let identity = tables.identities.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        identity.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn delete(&self, id: ProfileId) -> Result<(), RepositoryError> {
        self.lock()
            .identities
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}
