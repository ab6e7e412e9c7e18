//! Support chat models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use ledgerdesk_core::{ChatId, ChatStatus, MessageId, MessageType, ProfileId};

/// A support thread between one customer and their assigned admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chat {
    pub id: ChatId,
    pub user_id: ProfileId,
    /// Cleared whenever the chat leaves the `active` status.
    pub admin_id: Option<ProfileId>,
    pub title: String,
    pub status: ChatStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    /// Whether `profile_id` is the chat's customer or its assigned admin.
    #[must_use]
    pub fn is_participant(&self, profile_id: ProfileId) -> bool {
        self.user_id == profile_id || self.admin_id == Some(profile_id)
    }
}

/// A stored chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender_id: ProfileId,
    pub content: String,
    pub message_type: MessageType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub seen_at: Option<DateTime<Utc>>,
    pub seen_by: Option<ProfileId>,
}

impl Message {
    /// Whether `profile_id` may mark this message as seen in `chat`.
    #[must_use]
    pub fn can_be_seen_by(&self, chat: &Chat, profile_id: ProfileId) -> bool {
        self.seen_at.is_none() && self.sender_id != profile_id && chat.is_participant(profile_id)
    }
}

/// Fields required to append a message.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub chat_id: ChatId,
    pub sender_id: ProfileId,
    pub content: String,
    pub message_type: MessageType,
}

/// A message joined with its sender's display fields.
///
/// Sender fields are `None` when the sender profile no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub sender_name: Option<String>,
    pub sender_avatar_url: Option<String>,
}

/// Admin inbox row.
#[derive(Debug, Clone, Serialize)]
pub struct ChatSummary {
    #[serde(flatten)]
    pub chat: Chat,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    /// Messages not sent by the viewing admin that nobody has seen yet.
    pub unseen_count: i64,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
}
