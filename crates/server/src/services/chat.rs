//! Support chat lifecycle: assignment, messages, seen-state, and status.
//!
//! Every write follows the same shape: validate, write through the
//! repositories, then publish a [`ChangeEvent`] so open streams pick it up.
//! Nothing here runs in a transaction. A message insert and the chat
//! `updated_at` touch that follows it are two separate writes.

use thiserror::Error;
use tracing::instrument;

use ledgerdesk_core::{ChatId, ChatStatus, InvalidVariant, MessageId, MessageType, ProfileId};

use crate::db::{Repositories, RepositoryError};
use crate::models::{Chat, ChatSummary, MessageView, NewMessage};
use crate::realtime::{ChangeEvent, ChangeKind, ChatNotifier};

/// Title given to chats created by the resolver.
pub const DEFAULT_CHAT_TITLE: &str = "Support chat";

/// Errors that can occur during chat operations.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// The user has no `created_by_admin_id` to route support to.
    #[error("no admin is assigned to this user")]
    AdminNotAssigned,

    /// The profile does not exist.
    #[error("user not found")]
    UserNotFound,

    /// The chat does not exist.
    #[error("chat not found")]
    ChatNotFound,

    /// The message does not exist.
    #[error("message not found")]
    MessageNotFound,

    /// Content was empty after trimming.
    #[error("message content cannot be empty")]
    EmptyMessage,

    /// Only the sender may edit a message.
    #[error("only the sender can edit this message")]
    NotSender,

    /// The caller is neither the chat's customer nor its admin.
    #[error("you are not a participant in this chat")]
    NotParticipant,

    /// Customers cannot post into a closed chat.
    #[error("chat is closed")]
    ChatClosed,

    /// Unknown chat status.
    #[error("{0}")]
    InvalidStatus(#[from] InvalidVariant),
}

/// Chat service over the shared repositories and notifier.
pub struct ChatService<'a> {
    repos: &'a Repositories,
    notifier: &'a ChatNotifier,
}

impl<'a> ChatService<'a> {
    /// Create a new chat service.
    #[must_use]
    pub const fn new(repos: &'a Repositories, notifier: &'a ChatNotifier) -> Self {
        Self { repos, notifier }
    }

    // =========================================================================
    // Assignment
    // =========================================================================

    /// Find or create the chat between a user and the admin who created them.
    ///
    /// Returns the oldest matching chat when duplicates exist. Concurrent
    /// first calls for the same user can each create a chat.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::UserNotFound` if the profile doesn't exist.
    /// Returns `ChatError::AdminNotAssigned` if it has no creating admin.
    #[instrument(skip(self))]
    pub async fn resolve_chat(&self, user_id: ProfileId) -> Result<Chat, ChatError> {
        let profile = self
            .repos
            .profiles
            .get(user_id)
            .await?
            .ok_or(ChatError::UserNotFound)?;
        let admin_id = profile
            .created_by_admin_id
            .ok_or(ChatError::AdminNotAssigned)?;

        if let Some(chat) = self.repos.chats.find_for_pair(user_id, admin_id).await? {
            return Ok(chat);
        }

        let chat = self
            .repos
            .chats
            .create(user_id, admin_id, DEFAULT_CHAT_TITLE)
            .await?;
        tracing::info!(chat_id = %chat.id, %admin_id, "Support chat created");
        Ok(chat)
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Get a chat by ID.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::ChatNotFound` if the chat doesn't exist.
    pub async fn get_chat(&self, chat_id: ChatId) -> Result<Chat, ChatError> {
        self.repos
            .chats
            .get(chat_id)
            .await?
            .ok_or(ChatError::ChatNotFound)
    }

    /// Get a chat the caller participates in.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::ChatNotFound` if the chat doesn't exist.
    /// Returns `ChatError::NotParticipant` if the caller isn't in it.
    pub async fn chat_for_participant(
        &self,
        chat_id: ChatId,
        caller: ProfileId,
    ) -> Result<Chat, ChatError> {
        let chat = self.get_chat(chat_id).await?;
        if !chat.is_participant(caller) {
            return Err(ChatError::NotParticipant);
        }
        Ok(chat)
    }

    /// Chats where the profile is the customer.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Repository` if the query fails.
    pub async fn list_for_user(&self, user_id: ProfileId) -> Result<Vec<Chat>, ChatError> {
        Ok(self.repos.chats.list_for_user(user_id).await?)
    }

    /// Admin inbox, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Repository` if the query fails.
    pub async fn list_summaries(
        &self,
        admin_id: ProfileId,
        status: Option<ChatStatus>,
    ) -> Result<Vec<ChatSummary>, ChatError> {
        Ok(self.repos.chats.list_summaries(admin_id, status).await?)
    }

    /// A single message with sender fields, used by streams to re-fetch.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Repository` if the query fails.
    pub async fn message_view(
        &self,
        message_id: MessageId,
    ) -> Result<Option<MessageView>, ChatError> {
        Ok(self.repos.messages.get_view(message_id).await?)
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Append a message and bump the chat's `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::EmptyMessage` if `text` is blank (nothing is written).
    /// Returns `ChatError::ChatNotFound` if the chat doesn't exist.
    #[instrument(skip(self, text, origin))]
    pub async fn send_message(
        &self,
        chat_id: ChatId,
        sender_id: ProfileId,
        text: &str,
        message_type: MessageType,
        origin: Option<&str>,
    ) -> Result<MessageView, ChatError> {
        let content = non_empty(text)?;
        self.get_chat(chat_id).await?;

        let message = self
            .repos
            .messages
            .insert(NewMessage {
                chat_id,
                sender_id,
                content: content.to_string(),
                message_type,
            })
            .await?;
        self.repos.chats.touch(chat_id, message.created_at).await?;

        let view = self
            .repos
            .messages
            .get_view(message.id)
            .await?
            .ok_or(ChatError::MessageNotFound)?;

        self.publish(ChangeKind::Insert, chat_id, message.id, origin);
        tracing::debug!(message_id = %message.id, "Message sent");
        Ok(view)
    }

    /// All messages of a chat, oldest first. Blank rows are skipped.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Repository` if the query fails.
    pub async fn load_messages(&self, chat_id: ChatId) -> Result<Vec<MessageView>, ChatError> {
        let mut messages = self.repos.messages.list_views(chat_id).await?;
        messages.retain(|view| !view.message.content.trim().is_empty());
        Ok(messages)
    }

    /// Replace the content of the caller's own message.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::MessageNotFound` if the message doesn't exist.
    /// Returns `ChatError::NotSender` if the caller didn't send it.
    /// Returns `ChatError::EmptyMessage` if `text` is blank.
    #[instrument(skip(self, text, origin))]
    pub async fn edit_message(
        &self,
        message_id: MessageId,
        caller: ProfileId,
        text: &str,
        origin: Option<&str>,
    ) -> Result<MessageView, ChatError> {
        let message = self
            .repos
            .messages
            .get(message_id)
            .await?
            .ok_or(ChatError::MessageNotFound)?;
        if message.sender_id != caller {
            return Err(ChatError::NotSender);
        }
        let content = non_empty(text)?;

        self.repos
            .messages
            .update_content(message_id, content)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ChatError::MessageNotFound,
                other => ChatError::Repository(other),
            })?;

        let view = self
            .repos
            .messages
            .get_view(message_id)
            .await?
            .ok_or(ChatError::MessageNotFound)?;

        self.publish(ChangeKind::Update, message.chat_id, message_id, origin);
        Ok(view)
    }

    /// Mark messages as seen by `seen_by`.
    ///
    /// A message is updated only if `seen_by` participates in its chat,
    /// didn't send it, and it hasn't been seen yet. Everything else,
    /// including unknown IDs, is skipped without error.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Repository` if a query fails.
    #[instrument(skip(self, message_ids, origin), fields(requested = message_ids.len()))]
    pub async fn mark_seen(
        &self,
        message_ids: &[MessageId],
        seen_by: ProfileId,
        origin: Option<&str>,
    ) -> Result<Vec<MessageView>, ChatError> {
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut eligible = Vec::new();
        for message in self.repos.messages.get_many(message_ids).await? {
            let Some(chat) = self.repos.chats.get(message.chat_id).await? else {
                continue;
            };
            if message.can_be_seen_by(&chat, seen_by) && !eligible.contains(&message.id) {
                eligible.push(message.id);
            }
        }
        if eligible.is_empty() {
            return Ok(Vec::new());
        }

        let updated = self.repos.messages.mark_seen(&eligible, seen_by).await?;

        let mut views = Vec::with_capacity(updated.len());
        for message_id in updated {
            if let Some(view) = self.repos.messages.get_view(message_id).await? {
                self.publish(ChangeKind::Update, view.message.chat_id, message_id, origin);
                views.push(view);
            }
        }
        Ok(views)
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// Move a chat to `status`.
    ///
    /// `active` assigns the chat to `acting_admin`; any other status clears
    /// the assignment. `updated_at` is always bumped.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::ChatNotFound` if the chat doesn't exist.
    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        chat_id: ChatId,
        status: ChatStatus,
        acting_admin: ProfileId,
    ) -> Result<Chat, ChatError> {
        let admin_id = status.keeps_assignment().then_some(acting_admin);

        let chat = self
            .repos
            .chats
            .set_status(chat_id, status, admin_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ChatError::ChatNotFound,
                other => ChatError::Repository(other),
            })?;

        tracing::info!(%chat_id, %status, "Chat status changed");
        Ok(chat)
    }

    /// Delete a chat and its messages.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::ChatNotFound` if the chat doesn't exist.
    #[instrument(skip(self))]
    pub async fn delete_chat(&self, chat_id: ChatId) -> Result<(), ChatError> {
        self.repos.chats.delete(chat_id).await.map_err(|e| match e {
            RepositoryError::NotFound => ChatError::ChatNotFound,
            other => ChatError::Repository(other),
        })
    }

    fn publish(
        &self,
        kind: ChangeKind,
        chat_id: ChatId,
        message_id: MessageId,
        origin: Option<&str>,
    ) {
        self.notifier.publish(ChangeEvent {
            kind,
            chat_id,
            message_id,
            origin_client: origin.map(String::from),
        });
    }
}

/// Trim `text`, rejecting it if nothing is left.
fn non_empty(text: &str) -> Result<&str, ChatError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ChatError::EmptyMessage);
    }
    Ok(trimmed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use ledgerdesk_core::{Email, Role};

    use super::*;
    use crate::models::NewProfile;
    use crate::realtime::SubscriptionEvent;

    struct Fixture {
        repos: Repositories,
        notifier: ChatNotifier,
        admin: ProfileId,
        user: ProfileId,
    }

    impl Fixture {
        async fn new() -> Self {
            let repos = Repositories::in_memory();
            let admin = add_profile(&repos, "admin@bank.test", Role::Admin, None).await;
            let user = add_profile(&repos, "user@bank.test", Role::User, Some(admin)).await;
            Self {
                repos,
                notifier: ChatNotifier::new(),
                admin,
                user,
            }
        }

        fn service(&self) -> ChatService<'_> {
            ChatService::new(&self.repos, &self.notifier)
        }
    }

    async fn add_profile(
        repos: &Repositories,
        email: &str,
        role: Role,
        created_by: Option<ProfileId>,
    ) -> ProfileId {
        repos
            .profiles
            .create(NewProfile {
                id: ProfileId::generate(),
                full_name: email.to_string(),
                email: Email::parse(email).unwrap(),
                role,
                created_by_admin_id: created_by,
                phone: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let fx = Fixture::new().await;
        let first = fx.service().resolve_chat(fx.user).await.unwrap();
        let second = fx.service().resolve_chat(fx.user).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.admin_id, Some(fx.admin));
        assert_eq!(first.status, ChatStatus::Active);
        assert_eq!(first.title, DEFAULT_CHAT_TITLE);
        assert_eq!(fx.repos.chats.list_for_user(fx.user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_without_admin() {
        let fx = Fixture::new().await;
        let orphan = add_profile(&fx.repos, "orphan@bank.test", Role::User, None).await;

        assert!(matches!(
            fx.service().resolve_chat(orphan).await,
            Err(ChatError::AdminNotAssigned)
        ));
        assert!(matches!(
            fx.service().resolve_chat(ProfileId::generate()).await,
            Err(ChatError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_blank_send_writes_nothing() {
        let fx = Fixture::new().await;
        let chat = fx.service().resolve_chat(fx.user).await.unwrap();

        let result = fx
            .service()
            .send_message(chat.id, fx.user, "  \n\t ", MessageType::Text, None)
            .await;

        assert!(matches!(result, Err(ChatError::EmptyMessage)));
        assert_eq!(fx.repos.messages.count_all().await.unwrap(), 0);
        let unchanged = fx.repos.chats.get(chat.id).await.unwrap().unwrap();
        assert_eq!(unchanged.updated_at, chat.updated_at);
    }

    #[tokio::test]
    async fn test_send_trims_and_touches_chat() {
        let fx = Fixture::new().await;
        let chat = fx.service().resolve_chat(fx.user).await.unwrap();

        let view = fx
            .service()
            .send_message(chat.id, fx.user, "  hello  ", MessageType::Text, None)
            .await
            .unwrap();

        assert_eq!(view.message.content, "hello");
        assert_eq!(view.sender_name.as_deref(), Some("user@bank.test"));
        let touched = fx.repos.chats.get(chat.id).await.unwrap().unwrap();
        assert!(touched.updated_at >= view.message.created_at);
    }

    #[tokio::test]
    async fn test_send_to_missing_chat() {
        let fx = Fixture::new().await;
        let result = fx
            .service()
            .send_message(ChatId::generate(), fx.user, "hi", MessageType::Text, None)
            .await;
        assert!(matches!(result, Err(ChatError::ChatNotFound)));
    }

    #[tokio::test]
    async fn test_load_is_ascending() {
        let fx = Fixture::new().await;
        let chat = fx.service().resolve_chat(fx.user).await.unwrap();
        for (sender, text) in [(fx.user, "one"), (fx.admin, "two"), (fx.user, "three")] {
            fx.service()
                .send_message(chat.id, sender, text, MessageType::Text, None)
                .await
                .unwrap();
        }

        let messages = fx.service().load_messages(chat.id).await.unwrap();
        let contents: Vec<&str> = messages
            .iter()
            .map(|m| m.message.content.as_str())
            .collect();
        assert_eq!(contents, ["one", "two", "three"]);
        assert!(
            messages
                .windows(2)
                .all(|pair| pair[0].message.created_at <= pair[1].message.created_at)
        );
    }

    #[tokio::test]
    async fn test_foreign_edit_is_rejected() {
        let fx = Fixture::new().await;
        let chat = fx.service().resolve_chat(fx.user).await.unwrap();
        let sent = fx
            .service()
            .send_message(chat.id, fx.user, "original", MessageType::Text, None)
            .await
            .unwrap();

        let result = fx
            .service()
            .edit_message(sent.message.id, fx.admin, "tampered", None)
            .await;
        assert!(matches!(result, Err(ChatError::NotSender)));

        let stored = fx.repos.messages.get(sent.message.id).await.unwrap().unwrap();
        assert_eq!(stored.content, "original");
    }

    #[tokio::test]
    async fn test_own_edit_bumps_updated_at() {
        let fx = Fixture::new().await;
        let chat = fx.service().resolve_chat(fx.user).await.unwrap();
        let sent = fx
            .service()
            .send_message(chat.id, fx.user, "typo", MessageType::Text, None)
            .await
            .unwrap();

        let edited = fx
            .service()
            .edit_message(sent.message.id, fx.user, " fixed ", None)
            .await
            .unwrap();
        assert_eq!(edited.message.content, "fixed");
        assert!(edited.message.updated_at > sent.message.updated_at);

        assert!(matches!(
            fx.service()
                .edit_message(sent.message.id, fx.user, "   ", None)
                .await,
            Err(ChatError::EmptyMessage)
        ));
        assert!(matches!(
            fx.service()
                .edit_message(MessageId::generate(), fx.user, "x", None)
                .await,
            Err(ChatError::MessageNotFound)
        ));
    }

    #[tokio::test]
    async fn test_mark_seen_skips_own_and_foreign() {
        let fx = Fixture::new().await;
        let outsider = add_profile(&fx.repos, "other@bank.test", Role::User, Some(fx.admin)).await;
        let chat = fx.service().resolve_chat(fx.user).await.unwrap();
        let from_user = fx
            .service()
            .send_message(chat.id, fx.user, "question", MessageType::Text, None)
            .await
            .unwrap();
        let from_admin = fx
            .service()
            .send_message(chat.id, fx.admin, "answer", MessageType::Text, None)
            .await
            .unwrap();
        let ids = [from_user.message.id, from_admin.message.id, MessageId::generate()];

        let seen = fx.service().mark_seen(&ids, fx.user, None).await.unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].message.id, from_admin.message.id);
        assert_eq!(seen[0].message.seen_by, Some(fx.user));
        assert!(seen[0].message.seen_at.is_some());

        let own = fx.repos.messages.get(from_user.message.id).await.unwrap().unwrap();
        assert!(own.seen_at.is_none());

        assert!(fx.service().mark_seen(&ids, outsider, None).await.unwrap().is_empty());
        assert!(fx.service().mark_seen(&ids, fx.user, None).await.unwrap().is_empty());
        assert!(fx.service().mark_seen(&[], fx.user, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let fx = Fixture::new().await;
        let other_admin = add_profile(&fx.repos, "second@bank.test", Role::Admin, None).await;
        let chat = fx.service().resolve_chat(fx.user).await.unwrap();

        let closed = fx
            .service()
            .set_status(chat.id, ChatStatus::Closed, fx.admin)
            .await
            .unwrap();
        assert_eq!(closed.status, ChatStatus::Closed);
        assert_eq!(closed.admin_id, None);
        assert!(closed.updated_at > chat.updated_at);

        let reopened = fx
            .service()
            .set_status(chat.id, ChatStatus::Active, other_admin)
            .await
            .unwrap();
        assert_eq!(reopened.admin_id, Some(other_admin));

        assert!(matches!(
            fx.service()
                .set_status(ChatId::generate(), ChatStatus::Pending, fx.admin)
                .await,
            Err(ChatError::ChatNotFound)
        ));
    }

    #[tokio::test]
    async fn test_writes_are_published() {
        let fx = Fixture::new().await;
        let chat = fx.service().resolve_chat(fx.user).await.unwrap();
        let mut sub = fx.notifier.subscribe(chat.id, Some("admin-tab".to_string()));

        let sent = fx
            .service()
            .send_message(chat.id, fx.user, "ping", MessageType::Text, Some("user-tab"))
            .await
            .unwrap();
        fx.service()
            .mark_seen(&[sent.message.id], fx.admin, Some("admin-tab"))
            .await
            .unwrap();
        fx.service()
            .edit_message(sent.message.id, fx.user, "pong", Some("user-tab"))
            .await
            .unwrap();

        let Some(SubscriptionEvent::Change(insert)) = sub.recv().await else {
            panic!("expected insert event");
        };
        assert_eq!(insert.kind, ChangeKind::Insert);
        assert_eq!(insert.message_id, sent.message.id);

        // The admin's own mark-seen is not echoed back to the admin tab.
        let Some(SubscriptionEvent::Change(update)) = sub.recv().await else {
            panic!("expected update event");
        };
        assert_eq!(update.kind, ChangeKind::Update);
        assert_eq!(update.origin_client.as_deref(), Some("user-tab"));
    }
}
