//! In-process change feed for chat messages.
//!
//! One `tokio::sync::broadcast` channel per chat, created on first
//! subscribe. Writers publish a [`ChangeEvent`] after a successful insert or
//! update; readers hold a [`ChatSubscription`] and re-fetch the message by
//! ID before delivering it. Events carry IDs only, so a lagging reader can
//! always recover by reloading the whole chat.
//!
//! The channel map lives in process memory: running more than one server
//! instance means subscribers only see writes made on their own instance.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast::{self, error::RecvError};

use ledgerdesk_core::{ChatId, MessageId};

/// Buffered events per chat before a slow subscriber starts lagging.
const CHANNEL_CAPACITY: usize = 256;

/// What happened to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
}

/// A message row changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub chat_id: ChatId,
    pub message_id: MessageId,
    /// Client that caused the write, if it identified itself.
    pub origin_client: Option<String>,
}

/// Item yielded by [`ChatSubscription::recv`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEvent {
    Change(ChangeEvent),
    /// Events were dropped; reload the chat before continuing.
    Resync,
}

/// Publish/subscribe hub keyed by chat.
#[derive(Clone, Default)]
pub struct ChatNotifier {
    channels: Arc<Mutex<HashMap<ChatId, broadcast::Sender<ChangeEvent>>>>,
}

impl ChatNotifier {
    /// Create an empty notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ChatId, broadcast::Sender<ChangeEvent>>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe to changes in one chat.
    ///
    /// Events published with `origin_client == client_id` are not delivered
    /// back to this subscriber. Dropping the returned handle unsubscribes.
    #[must_use]
    pub fn subscribe(&self, chat_id: ChatId, client_id: Option<String>) -> ChatSubscription {
        let mut channels = self.lock();
        channels.retain(|_, sender| sender.receiver_count() > 0);
        let receiver = channels
            .entry(chat_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe();

        tracing::debug!(%chat_id, client_id = ?client_id, "chat subscription opened");

        ChatSubscription {
            chat_id,
            client_id,
            receiver,
        }
    }

    /// Publish a change. Returns how many subscribers were listening.
    ///
    /// A chat with no subscribers left has its channel removed.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        let mut channels = self.lock();
        let Some(sender) = channels.get(&event.chat_id) else {
            return 0;
        };

        let chat_id = event.chat_id;
        match sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                channels.remove(&chat_id);
                0
            }
        }
    }

    /// Number of chats with an open channel.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.lock().len()
    }
}

impl std::fmt::Debug for ChatNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatNotifier")
            .field("channels", &self.channel_count())
            .finish()
    }
}

/// A live subscription to one chat.
#[derive(Debug)]
pub struct ChatSubscription {
    chat_id: ChatId,
    client_id: Option<String>,
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl ChatSubscription {
    /// The chat this subscription follows.
    #[must_use]
    pub const fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    /// Wait for the next event not caused by this subscriber.
    ///
    /// Returns `None` once the notifier has gone away.
    pub async fn recv(&mut self) -> Option<SubscriptionEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.client_id.is_some() && event.origin_client == self.client_id {
                        continue;
                    }
                    return Some(SubscriptionEvent::Change(event));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(chat_id = %self.chat_id, skipped, "chat subscriber lagged");
                    return Some(SubscriptionEvent::Resync);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: ChangeKind, chat_id: ChatId, origin: Option<&str>) -> ChangeEvent {
        ChangeEvent {
            kind,
            chat_id,
            message_id: MessageId::generate(),
            origin_client: origin.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_delivers_in_publish_order() {
        let notifier = ChatNotifier::new();
        let chat_id = ChatId::generate();
        let mut sub = notifier.subscribe(chat_id, None);

        let first = event(ChangeKind::Insert, chat_id, None);
        let second = event(ChangeKind::Update, chat_id, None);
        assert_eq!(notifier.publish(first.clone()), 1);
        assert_eq!(notifier.publish(second.clone()), 1);

        assert_eq!(sub.recv().await, Some(SubscriptionEvent::Change(first)));
        assert_eq!(sub.recv().await, Some(SubscriptionEvent::Change(second)));
    }

    #[tokio::test]
    async fn test_skips_own_origin() {
        let notifier = ChatNotifier::new();
        let chat_id = ChatId::generate();
        let mut sub = notifier.subscribe(chat_id, Some("tab-1".to_string()));

        notifier.publish(event(ChangeKind::Insert, chat_id, Some("tab-1")));
        let foreign = event(ChangeKind::Insert, chat_id, Some("tab-2"));
        notifier.publish(foreign.clone());

        assert_eq!(sub.recv().await, Some(SubscriptionEvent::Change(foreign)));
    }

    #[tokio::test]
    async fn test_other_chats_are_isolated() {
        let notifier = ChatNotifier::new();
        let watched = ChatId::generate();
        let mut sub = notifier.subscribe(watched, None);

        assert_eq!(
            notifier.publish(event(ChangeKind::Insert, ChatId::generate(), None)),
            0
        );
        let mine = event(ChangeKind::Insert, watched, None);
        notifier.publish(mine.clone());

        assert_eq!(sub.recv().await, Some(SubscriptionEvent::Change(mine)));
    }

    #[tokio::test]
    async fn test_lag_yields_resync() {
        let notifier = ChatNotifier::new();
        let chat_id = ChatId::generate();
        let mut sub = notifier.subscribe(chat_id, None);

        for _ in 0..=CHANNEL_CAPACITY {
            notifier.publish(event(ChangeKind::Insert, chat_id, None));
        }

        assert_eq!(sub.recv().await, Some(SubscriptionEvent::Resync));
        assert!(matches!(
            sub.recv().await,
            Some(SubscriptionEvent::Change(_))
        ));
    }

    #[test]
    fn test_dropped_subscription_prunes_channel() {
        let notifier = ChatNotifier::new();
        let chat_id = ChatId::generate();
        let sub = notifier.subscribe(chat_id, None);
        assert_eq!(notifier.channel_count(), 1);

        drop(sub);
        assert_eq!(notifier.publish(event(ChangeKind::Insert, chat_id, None)), 0);
        assert_eq!(notifier.channel_count(), 0);
    }
}
